pub mod disk;
pub mod memory;

use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use disk::DiskCache;
use memory::MemoryCache;
use std::sync::Arc;
use tracing::warn;

/// Picks the cache backing the query layer. A persistent cache that cannot be
/// opened degrades to memory so commands keep working.
pub fn open_cache(config: &AppConfig) -> Arc<dyn Cache> {
    if !config.query.persist {
        return Arc::new(MemoryCache::new());
    }

    let opened = config
        .default_data_path()
        .map_err(|e| e.to_string())
        .and_then(|path| DiskCache::open(&path.join("cache")).map_err(|e| e.to_string()));

    match opened {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!("Failed to open disk cache: {}. Falling back to memory", e);
            Arc::new(MemoryCache::new())
        }
    }
}
