//! Daily exchange rates from the `forex_rates` table.

use crate::backend::{Order, RestClient};
use crate::core::currency::Currency;
use crate::core::error::{Result, ResultExt};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rates are quoted against this currency.
pub const QUOTE_BASE: Currency = Currency::Usd;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ForexRate {
    pub id: String,
    pub base_currency: Currency,
    pub target_currency: Currency,
    pub date: String,
    pub rate: f64,
    pub source: Option<String>,
    pub created_at: Option<String>,
}

/// Returned by the `get_unique_currency_pairs` function.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CurrencyPair {
    pub base_currency: String,
    pub target_currency: String,
}

/// Optional narrowing for [`ForexApi::history`]. Dates are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RateFilters {
    pub base: Option<Currency>,
    pub target: Option<Currency>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RateFilters {
    fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub mod keys {
    use super::RateFilters;
    use crate::core::currency::Currency;
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("forex")
    }

    pub fn history(filters: &RateFilters) -> QueryKey {
        all().with("history").with(filters.cache_key())
    }

    pub fn latest() -> QueryKey {
        all().with("latest")
    }

    pub fn latest_pair(base: Currency, target: Currency) -> QueryKey {
        latest().with(base.code()).with(target.code())
    }

    pub fn pairs() -> QueryKey {
        all().with("pairs")
    }
}

pub struct ForexApi<'a> {
    client: &'a RestClient,
}

impl<'a> ForexApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Rates ordered by date ascending.
    pub async fn history(&self, filters: &RateFilters) -> Result<Vec<ForexRate>> {
        let mut query = self.client.from("forex_rates");
        if let Some(base) = filters.base {
            query = query.eq("base_currency", base.code());
        }
        if let Some(target) = filters.target {
            query = query.eq("target_currency", target.code());
        }
        if let Some(start) = filters.start {
            query = query.gte("date", start);
        }
        if let Some(end) = filters.end {
            query = query.lte("date", end);
        }

        query
            .order("date", Order::Asc)
            .fetch()
            .await
            .during("fetch historical rates")
    }

    /// Most recent rate from [`QUOTE_BASE`] to every other supported currency.
    pub async fn latest(&self) -> Result<Vec<ForexRate>> {
        let rates: Vec<ForexRate> = self
            .client
            .from("forex_rates")
            .eq("base_currency", QUOTE_BASE.code())
            .order("date", Order::Desc)
            .limit(Currency::ALL.len() - 1)
            .fetch()
            .await
            .during("fetch latest rates")?;
        debug!("Loaded {} latest rates", rates.len());
        Ok(rates)
    }

    pub async fn latest_pair(&self, base: Currency, target: Currency) -> Result<Option<ForexRate>> {
        self.client
            .from("forex_rates")
            .eq("base_currency", base.code())
            .eq("target_currency", target.code())
            .order("date", Order::Desc)
            .limit(1)
            .fetch_single()
            .await
            .during("fetch latest rate")
    }

    pub async fn pairs(&self) -> Result<Vec<CurrencyPair>> {
        self.client
            .rpc("get_unique_currency_pairs", &serde_json::json!({}))?
            .fetch()
            .await
            .during("fetch currency pairs")
    }
}

/// Converts `amount` with the latest USD-based rates, going through USD when
/// neither side is the quote base. `None` when a needed rate is missing.
pub fn convert(amount: f64, from: Currency, to: Currency, latest: &[ForexRate]) -> Option<f64> {
    if from == to {
        return Some(amount);
    }
    let rate_to = |currency: Currency| {
        if currency == QUOTE_BASE {
            return Some(1.0);
        }
        latest
            .iter()
            .find(|r| r.base_currency == QUOTE_BASE && r.target_currency == currency)
            .map(|r| r.rate)
            .filter(|rate| *rate != 0.0)
    };
    Some(amount / rate_to(from)? * rate_to(to)?)
}


#[cfg(test)]
mod tests {
    use super::fixtures::rate;
    use super::*;
    use crate::backend::testing::{client, not_found_body};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_history_applies_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/forex_rates"))
            .and(query_param("base_currency", "eq.USD"))
            .and(query_param("target_currency", "eq.EUR"))
            .and(query_param("date", "gte.2024-06-01"))
            .and(query_param("order", "date.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                rate("EUR", "2024-06-03", 0.92),
                rate("EUR", "2024-06-04", 0.93)
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let filters = RateFilters {
            base: Some(Currency::Usd),
            target: Some(Currency::Eur),
            start: NaiveDate::from_ymd_opt(2024, 6, 1),
            end: None,
        };
        let rates = ForexApi::new(&client).history(&filters).await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[1].rate, 0.93);

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].url.query().unwrap_or("").contains("lte"));
    }

    #[tokio::test]
    async fn test_latest_limits_to_other_currencies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/forex_rates"))
            .and(query_param("base_currency", "eq.USD"))
            .and(query_param("order", "date.desc"))
            .and(query_param("limit", "6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                rate("EUR", "2024-06-04", 0.93)
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let rates = ForexApi::new(&client).latest().await.unwrap();
        assert_eq!(rates[0].target_currency, Currency::Eur);
    }

    #[tokio::test]
    async fn test_latest_pair_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/forex_rates"))
            .and(query_param("target_currency", "eq.JPY"))
            .respond_with(ResponseTemplate::new(406).set_body_json(not_found_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let rate = ForexApi::new(&client)
            .latest_pair(Currency::Usd, Currency::Jpy)
            .await
            .unwrap();
        assert!(rate.is_none());
    }

    #[tokio::test]
    async fn test_pairs_error_names_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_unique_currency_pairs"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": "PGRST202",
                "message": "Could not find the function"
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let err = ForexApi::new(&client).pairs().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch currency pairs: Could not find the function"
        );
    }

    #[test]
    fn test_convert_through_base() {
        let latest: Vec<ForexRate> = vec![
            serde_json::from_value(rate("EUR", "2024-06-04", 0.5)).unwrap(),
            serde_json::from_value(rate("GBP", "2024-06-04", 0.25)).unwrap(),
        ];
        assert_eq!(convert(10.0, Currency::Usd, Currency::Eur, &latest), Some(5.0));
        assert_eq!(convert(10.0, Currency::Eur, Currency::Gbp, &latest), Some(5.0));
        assert_eq!(convert(10.0, Currency::Eur, Currency::Eur, &[]), Some(10.0));
        assert_eq!(convert(10.0, Currency::Eur, Currency::Jpy, &latest), None);
    }
}
