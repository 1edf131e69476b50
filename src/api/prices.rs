use crate::api::lookback_filter;
use crate::backend::{Order, RestClient};
use crate::core::error::{Result, ResultExt};
use crate::core::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoricalPrice {
    pub id: String,
    pub ticker_id: String,
    pub date: String,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub volume: Option<f64>,
    pub dividends: Option<f64>,
    pub stock_splits: Option<f64>,
}

pub mod keys {
    use crate::core::query::QueryKey;
    use crate::core::timeframe::Timeframe;

    pub fn all() -> QueryKey {
        QueryKey::root("tickerPrices")
    }

    pub fn ticker(ticker_id: &str) -> QueryKey {
        all().with(ticker_id)
    }

    pub fn timeframe(ticker_id: &str, timeframe: Timeframe) -> QueryKey {
        ticker(ticker_id).with(timeframe)
    }
}

pub struct PricesApi<'a> {
    client: &'a RestClient,
}

impl<'a> PricesApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn historical(
        &self,
        ticker_id: Option<&str>,
        timeframe: Timeframe,
    ) -> Result<Vec<HistoricalPrice>> {
        self.historical_at(ticker_id, timeframe, Utc::now()).await
    }

    /// Daily prices for one ticker, oldest first, within the lookback window
    /// ending at `now`.
    pub async fn historical_at(
        &self,
        ticker_id: Option<&str>,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPrice>> {
        let Some(ticker_id) = ticker_id else {
            return Ok(Vec::new());
        };
        let start = lookback_filter(timeframe, now)?;

        let mut query = self
            .client
            .from("historical_prices")
            .eq("ticker_id", ticker_id)
            .order("date", Order::Asc);
        if let Some(start) = start {
            query = query.gte("date", start);
        }
        query.fetch().await.during("fetch historical prices")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::backend::testing::client;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_one_month_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/historical_prices"))
            .and(query_param("ticker_id", "eq.aapl"))
            .and(query_param("order", "date.asc"))
            .and(query_param("date", "gte.2024-05-15T12:00:00.000Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "p1", "ticker_id": "aapl", "date": "2024-05-15", "open_price": 189.0,
                 "high_price": 191.0, "low_price": 188.5, "close_price": 190.2, "volume": 5.1e7,
                 "dividends": 0.0, "stock_splits": 0.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let prices = PricesApi::new(&client)
            .historical_at(Some("aapl"), Timeframe::OneMonth, now())
            .await
            .unwrap();
        assert_eq!(prices[0].close_price, Some(190.2));
    }

    #[tokio::test]
    async fn test_all_time_has_no_date_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/historical_prices"))
            .and(query_param_is_missing("date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let prices = PricesApi::new(&client)
            .historical_at(Some("aapl"), Timeframe::AllTime, now())
            .await
            .unwrap();
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_calendar_timeframe_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let api = PricesApi::new(&client);
        let err = api
            .historical_at(Some("aapl"), Timeframe::Quarter, now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedTimeframe(_)));
        assert!(api.historical_at(None, Timeframe::OneWeek, now()).await.unwrap().is_empty());
    }
}
