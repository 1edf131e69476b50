use crate::core::cache::Cache;
use crate::core::error::{Error, Result};
use crate::core::query::QueryKey;
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

const PARTITION: &str = "queries";

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// Query cache persisted in a fjall keyspace, so results survive restarts
/// until their TTL runs out.
pub struct DiskCache {
    _keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCache {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::Cache(e.to_string()))?;
        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened disk cache at {}", path.display());
        Ok(Self {
            _keyspace: keyspace,
            partition,
        })
    }

    fn remove_keys(&self, keys: Vec<Vec<u8>>) -> Result<usize> {
        let count = keys.len();
        for key in keys {
            self.partition.remove(key)?;
        }
        Ok(count)
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &QueryKey) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.partition.get(key.to_bytes())? else {
            debug!("Cache MISS for key: {}", key);
            return Ok(None);
        };
        let entry: CacheEntry =
            serde_json::from_slice(&raw).map_err(|e| Error::Cache(e.to_string()))?;
        if entry
            .expires_at
            .is_some_and(|expires_at| SystemTime::now() >= expires_at)
        {
            debug!("Cache entry expired for key: {}", key);
            self.partition.remove(key.to_bytes())?;
            return Ok(None);
        }
        debug!("Cache HIT for key: {}", key);
        Ok(Some(entry.value))
    }

    async fn put(&self, key: &QueryKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|d| SystemTime::now() + d),
        };
        let raw = serde_json::to_vec(&entry).map_err(|e| Error::Cache(e.to_string()))?;
        self.partition.insert(key.to_bytes(), raw)?;
        debug!("Cache PUT for key: {}", key);
        Ok(())
    }

    async fn invalidate(&self, prefix: &QueryKey) -> Result<usize> {
        let mut keys = Vec::new();
        for kv in self.partition.prefix(prefix.to_bytes()) {
            let (k, _) = kv?;
            keys.push(k.to_vec());
        }
        let removed = self.remove_keys(keys)?;
        debug!("Cache INVALIDATE {} removed {} entries", prefix, removed);
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut keys = Vec::new();
        for kv in self.partition.iter() {
            let (k, _) = kv?;
            keys.push(k.to_vec());
        }
        self.remove_keys(keys)?;
        debug!("Cache CLEAR");
        Ok(())
    }
}
