//! Cached queries and cache-invalidating mutations over [`Api`].
//!
//! Every read goes through [`QueryClient::fetch`]: a fresh cache entry is
//! returned as is, otherwise the request runs under the retry policy and the
//! result is cached for the stale time. Queries whose required identifier is
//! missing return [`QueryState::Idle`] without touching cache or network.

pub mod investing;
pub mod market;
pub mod mutations;
pub mod spending;

use crate::api::Api;
use crate::backend::util::with_retry;
use crate::core::cache::Cache;
use crate::core::config::QueryConfig;
use crate::core::error::Result;
use crate::core::query::QueryKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use market::FundsData;

pub struct QueryClient {
    api: Api,
    cache: Arc<dyn Cache>,
    stale_time: Duration,
    retries: usize,
    retry_delay_ms: u64,
}

impl QueryClient {
    pub fn new(api: Api, cache: Arc<dyn Cache>, config: &QueryConfig) -> Self {
        Self {
            api,
            cache,
            stale_time: Duration::from_secs(config.stale_time_secs),
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Returns the cached value for `key`, or runs `fetcher` and caches its
    /// result. Cache failures are logged and treated as misses.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => return Ok(value),
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }

        debug!("Fetching {}", key);
        let value = with_retry(fetcher, self.retries, self.retry_delay_ms).await?;

        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                if let Err(e) = self.cache.put(&key, bytes, Some(self.stale_time)).await {
                    warn!("Failed to cache {}: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to serialize {} for caching: {}", key, e),
        }
        Ok(value)
    }

    /// Drops every cached query under `prefix`.
    pub async fn invalidate(&self, prefix: &QueryKey) -> Result<usize> {
        let removed = self.cache.invalidate(prefix).await?;
        debug!("Invalidated {} entries under {}", removed, prefix);
        Ok(removed)
    }

    /// Drops every cached query.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        info!("Cache cleared");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::query_client;
    use crate::api::holdings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn holdings_body() -> serde_json::Value {
        serde_json::json!([{"symbol": "AAPL", "exchange": "NASDAQ", "shares": 10.0}])
    }

    #[tokio::test]
    async fn test_cached_within_stale_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(holdings_body()))
            .expect(1)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let first = queries.holdings().await.unwrap();
        let second = queries.holdings().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_refetch_after_invalidation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(holdings_body()))
            .expect(2)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        queries.holdings().await.unwrap();
        let removed = queries.invalidate(&holdings::keys::all()).await.unwrap();
        assert_eq!(removed, 1);
        queries.holdings().await.unwrap();
    }

    #[tokio::test]
    async fn test_refetch_after_clear() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(holdings_body()))
            .expect(2)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        queries.holdings().await.unwrap();
        queries.clear_cache().await.unwrap();
        queries.holdings().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(holdings_body()))
            .expect(1)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let holdings = queries.holdings().await.unwrap();
        assert_eq!(holdings.len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried_or_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "JWT expired"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        assert_eq!(
            queries.holdings().await.unwrap_err().to_string(),
            "JWT expired"
        );
        assert!(queries.holdings().await.is_err());
    }
}
