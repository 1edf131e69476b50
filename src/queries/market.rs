use super::QueryClient;
use crate::api::forex::{self, CurrencyPair, ForexRate, RateFilters};
use crate::api::funds::{self, AssetClass, SectorWeighting, TopHolding};
use crate::api::industries::{self, Industry, IndustryWithSector};
use crate::api::market_indices::{self, MarketIndex};
use crate::api::sectors::{self, Sector, SectorWithIndustries};
use crate::api::tickers::{self, Ticker, TickerFilters};
use crate::core::currency::Currency;
use crate::core::error::Result;
use crate::core::query::QueryState;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Composition of one fund.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FundsData {
    pub top_holdings: Vec<TopHolding>,
    pub sector_weightings: Vec<SectorWeighting>,
    pub asset_classes: Vec<AssetClass>,
}

impl QueryClient {
    /// Holdings, sector weightings and asset classes fetched concurrently.
    /// Any failure fails the whole result.
    pub async fn funds_data(&self, ticker_id: Option<&str>) -> Result<QueryState<FundsData>> {
        let Some(ticker_id) = ticker_id else {
            return Ok(QueryState::Idle);
        };
        let api = self.api();

        let (top_holdings, sector_weightings, asset_classes) = tokio::try_join!(
            self.fetch(funds::keys::top_holdings(ticker_id), move || async move {
                api.funds().top_holdings(Some(ticker_id)).await
            }),
            self.fetch(funds::keys::sector_weightings(ticker_id), move || async move {
                api.funds().sector_weightings(Some(ticker_id)).await
            }),
            self.fetch(funds::keys::asset_classes(ticker_id), move || async move {
                api.funds().asset_classes(Some(ticker_id)).await
            }),
        )?;

        Ok(QueryState::Ready(FundsData {
            top_holdings,
            sector_weightings,
            asset_classes,
        }))
    }

    pub async fn tickers(&self, filters: &TickerFilters) -> Result<Vec<Ticker>> {
        let api = self.api();
        self.fetch(tickers::keys::list(filters), move || async move {
            api.tickers().list(filters).await
        })
        .await
    }

    pub async fn ticker(&self, exchange: &str, symbol: &str) -> Result<Option<Ticker>> {
        let api = self.api();
        self.fetch(tickers::keys::detail(exchange, symbol), move || async move {
            api.tickers().by_symbol(exchange, symbol).await
        })
        .await
    }

    pub async fn ticker_by_id(&self, id: &str) -> Result<Option<Ticker>> {
        let api = self.api();
        self.fetch(tickers::keys::by_id(id), move || async move {
            api.tickers().by_id(id).await
        })
        .await
    }

    pub async fn sectors(&self) -> Result<Vec<Sector>> {
        let api = self.api();
        self.fetch(sectors::keys::all(), move || async move {
            api.sectors().all().await
        })
        .await
    }

    pub async fn sector(&self, key: &str) -> Result<Option<Sector>> {
        let api = self.api();
        self.fetch(sectors::keys::detail(key), move || async move {
            api.sectors().by_key(key).await
        })
        .await
    }

    pub async fn sector_with_industries(&self, key: &str) -> Result<Option<SectorWithIndustries>> {
        let api = self.api();
        self.fetch(sectors::keys::with_industries(key), move || async move {
            api.sectors().with_industries(key).await
        })
        .await
    }

    /// Every sector with its industries. Sectors whose lookup comes back
    /// empty are left out; the rest keep the sector list's order.
    pub async fn sectors_with_industries(&self) -> Result<Vec<SectorWithIndustries>> {
        let sectors = self.sectors().await?;
        let details = try_join_all(
            sectors
                .iter()
                .map(|sector| self.sector_with_industries(&sector.key)),
        )
        .await?;

        let found: Vec<SectorWithIndustries> = details.into_iter().flatten().collect();
        debug!(
            "Loaded industries for {} of {} sectors",
            found.len(),
            sectors.len()
        );
        Ok(found)
    }

    pub async fn industries(&self) -> Result<Vec<Industry>> {
        let api = self.api();
        self.fetch(industries::keys::all(), move || async move {
            api.industries().all().await
        })
        .await
    }

    pub async fn industries_by_sector(&self, sector_key: &str) -> Result<Vec<Industry>> {
        let api = self.api();
        self.fetch(industries::keys::by_sector(sector_key), move || async move {
            api.industries().by_sector(sector_key).await
        })
        .await
    }

    pub async fn industry(&self, key: &str) -> Result<Option<IndustryWithSector>> {
        let api = self.api();
        self.fetch(industries::keys::detail(key), move || async move {
            api.industries().by_key(key).await
        })
        .await
    }

    pub async fn sector_tickers(&self, sector_key: &str) -> Result<Vec<Ticker>> {
        let api = self.api();
        self.fetch(tickers::keys::sector(sector_key), move || async move {
            api.tickers().tradeable_in_sector(sector_key).await
        })
        .await
    }

    pub async fn industry_tickers(&self, industry_key: &str) -> Result<Vec<Ticker>> {
        let api = self.api();
        self.fetch(tickers::keys::industry(industry_key), move || async move {
            api.tickers().tradeable_in_industry(industry_key).await
        })
        .await
    }

    pub async fn sector_index(&self, sector_key: &str) -> Result<Option<MarketIndex>> {
        let api = self.api();
        self.fetch(market_indices::keys::sector(sector_key), move || async move {
            api.market_indices().for_sector(sector_key).await
        })
        .await
    }

    pub async fn industry_index(&self, industry_key: &str) -> Result<Option<MarketIndex>> {
        let api = self.api();
        self.fetch(market_indices::keys::industry(industry_key), move || async move {
            api.market_indices().for_industry(industry_key).await
        })
        .await
    }

    pub async fn sector_indices(&self) -> Result<Vec<MarketIndex>> {
        let api = self.api();
        self.fetch(market_indices::keys::all_sectors(), move || async move {
            api.market_indices().sectors().await
        })
        .await
    }

    pub async fn industry_indices(&self) -> Result<Vec<MarketIndex>> {
        let api = self.api();
        self.fetch(market_indices::keys::all_industries(), move || async move {
            api.market_indices().industries().await
        })
        .await
    }

    pub async fn latest_rates(&self) -> Result<Vec<ForexRate>> {
        let api = self.api();
        self.fetch(forex::keys::latest(), move || async move {
            api.forex().latest().await
        })
        .await
    }

    pub async fn latest_rate(&self, base: Currency, target: Currency) -> Result<Option<ForexRate>> {
        let api = self.api();
        self.fetch(forex::keys::latest_pair(base, target), move || async move {
            api.forex().latest_pair(base, target).await
        })
        .await
    }

    pub async fn rate_history(&self, filters: &RateFilters) -> Result<Vec<ForexRate>> {
        let api = self.api();
        self.fetch(forex::keys::history(filters), move || async move {
            api.forex().history(filters).await
        })
        .await
    }

    pub async fn currency_pairs(&self) -> Result<Vec<CurrencyPair>> {
        let api = self.api();
        self.fetch(forex::keys::pairs(), move || async move {
            api.forex().pairs().await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::forex::fixtures::rate;
    use crate::api::sectors::fixtures::{industry, sector};
    use crate::core::currency::Currency;
    use crate::backend::testing::not_found_body;
    use crate::queries::testing::query_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_funds_data_idle_without_ticker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        assert!(queries.funds_data(None).await.unwrap().is_idle());
    }

    #[tokio::test]
    async fn test_funds_data_fetches_all_three() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fund_top_holdings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "h1", "ticker_id": "voo", "holding_name": "Apple Inc", "holding_symbol": "AAPL",
                 "weight": 7.1, "date": "2024-06-30", "created_at": null, "updated_at": null}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fund_sector_weightings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "w1", "ticker_id": "voo", "sector_name": "technology", "weight": 31.2,
                 "date": "2024-06-30", "created_at": null, "updated_at": null}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fund_asset_classes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let data = queries.funds_data(Some("voo")).await.unwrap().ready().unwrap();
        assert_eq!(data.top_holdings.len(), 1);
        assert_eq!(data.sector_weightings[0].sector_name, "technology");
        assert!(data.asset_classes.is_empty());
    }

    #[tokio::test]
    async fn test_funds_data_fails_when_one_part_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fund_sector_weightings"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "bad request"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let err = queries.funds_data(Some("voo")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch sector weightings: bad request"
        );
    }

    #[tokio::test]
    async fn test_sectors_with_industries_drops_missing_and_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("order", "name.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                sector("s1", "energy", "Energy"),
                sector("s2", "healthcare", "Healthcare"),
                sector("s3", "technology", "Technology")
            ])))
            .mount(&server)
            .await;
        for (id, key, name) in [("s1", "energy", "Energy"), ("s3", "technology", "Technology")] {
            Mock::given(method("GET"))
                .and(path("/rest/v1/sectors"))
                .and(query_param("key", format!("eq.{key}").as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(sector(id, key, name)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("key", "eq.healthcare"))
            .respond_with(ResponseTemplate::new(406).set_body_json(not_found_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/industries"))
            .and(query_param("sector_id", "eq.s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                industry("i1", "oil-gas-integrated", "Oil & Gas Integrated", "s1")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/industries"))
            .and(query_param("sector_id", "eq.s3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let result = queries.sectors_with_industries().await.unwrap();
        let keys: Vec<&str> = result.iter().map(|s| s.sector.key.as_str()).collect();
        assert_eq!(keys, vec!["energy", "technology"]);
        assert_eq!(result[0].industries.len(), 1);
    }

    #[tokio::test]
    async fn test_sectors_with_industries_fails_on_one_industry_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("order", "name.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                sector("s1", "energy", "Energy"),
                sector("s2", "technology", "Technology")
            ])))
            .mount(&server)
            .await;
        for (id, key, name) in [("s1", "energy", "Energy"), ("s2", "technology", "Technology")] {
            Mock::given(method("GET"))
                .and(path("/rest/v1/sectors"))
                .and(query_param("key", format!("eq.{key}").as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(sector(id, key, name)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/rest/v1/industries"))
            .and(query_param("sector_id", "eq.s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                industry("i1", "oil-gas-integrated", "Oil & Gas Integrated", "s1")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/industries"))
            .and(query_param("sector_id", "eq.s2"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "code": "42501",
                "message": "permission denied for table industries"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let err = queries.sectors_with_industries().await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table industries");
        assert_eq!(err.remote().map(|r| r.status), Some(403));

        // nothing partial was cached for the failed sector
        assert!(queries.sector_with_industries("technology").await.is_err());
    }

    #[tokio::test]
    async fn test_sectors_with_industries_fails_on_sector_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("order", "name.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                sector("s1", "energy", "Energy")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("key", "eq.energy"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream timeout"))
            .expect(2)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let err = queries.sectors_with_industries().await.unwrap_err();
        assert_eq!(err.to_string(), "upstream timeout");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_sector_tickers_cached_by_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("select", "id"))
            .respond_with(ResponseTemplate::new(406).set_body_json(not_found_body()))
            .expect(1)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        assert!(queries.sector_tickers("nope").await.unwrap().is_empty());
        assert!(queries.sector_tickers("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_rate_and_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/forex_rates"))
            .and(query_param("target_currency", "eq.EUR"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rate("EUR", "2024-06-04", 0.93)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_unique_currency_pairs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"base_currency": "USD", "target_currency": "EUR"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let latest = queries
            .latest_rate(Currency::Usd, Currency::Eur)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.rate, 0.93);
        queries.latest_rate(Currency::Usd, Currency::Eur).await.unwrap();

        let pairs = queries.currency_pairs().await.unwrap();
        assert_eq!(pairs[0].target_currency, "EUR");
    }
}
