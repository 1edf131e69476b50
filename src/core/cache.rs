use crate::core::error::Result;
use crate::core::query::QueryKey;
use async_trait::async_trait;
use std::time::Duration;

/// Storage behind the query layer. Values are serialized query results.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &QueryKey) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &QueryKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Removes every entry whose key starts with `prefix`; returns how many.
    async fn invalidate(&self, prefix: &QueryKey) -> Result<usize>;

    async fn clear(&self) -> Result<()>;
}
