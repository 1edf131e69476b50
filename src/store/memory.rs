use crate::core::cache::Cache;
use crate::core::error::Result;
use crate::core::query::QueryKey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheValue {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-memory query cache with per-entry expiry.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Mutex<HashMap<QueryKey, CacheValue>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &QueryKey) -> Result<Option<Vec<u8>>> {
        let mut cache = self.inner.lock().await;
        if let Some(entry) = cache.get(key) {
            if entry.expires_at.is_some_and(|expiry| expiry <= Instant::now()) {
                debug!("Cache entry expired for key: {}", key);
                cache.remove(key);
                return Ok(None);
            }
            debug!("Cache HIT for key: {}", key);
            return Ok(Some(entry.value.clone()));
        }
        debug!("Cache MISS for key: {}", key);
        Ok(None)
    }

    async fn put(&self, key: &QueryKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {}", key);
        cache.insert(key.clone(), CacheValue { value, expires_at });
        Ok(())
    }

    async fn invalidate(&self, prefix: &QueryKey) -> Result<usize> {
        let mut cache = self.inner.lock().await;
        let before = cache.len();
        cache.retain(|key, _| !key.starts_with(prefix));
        let removed = before - cache.len();
        debug!("Cache INVALIDATE {} removed {} entries", prefix, removed);
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
        Ok(())
    }
}
