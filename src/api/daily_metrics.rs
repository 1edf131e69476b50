use crate::api::lookback_filter;
use crate::backend::{Order, RestClient};
use crate::core::error::{Result, ResultExt};
use crate::core::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One day of portfolio valuation from the `portfolio_daily_metrics` view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PortfolioDailyMetric {
    pub current_date: String,
    pub user_id: Option<String>,
    pub cash_balance: Option<f64>,
    pub cost_basis: Option<f64>,
    pub portfolio_value: Option<f64>,
    pub previous_day_portfolio_value: Option<f64>,
    pub total_portfolio_value: Option<f64>,
    pub daily_investment_twrr_percent: Option<f64>,
}

pub mod keys {
    use crate::core::query::QueryKey;
    use crate::core::timeframe::Timeframe;

    pub fn all() -> QueryKey {
        QueryKey::root("dailyMetrics")
    }

    pub fn timeframe(timeframe: Timeframe) -> QueryKey {
        all().with(timeframe)
    }
}

pub struct DailyMetricsApi<'a> {
    client: &'a RestClient,
}

impl<'a> DailyMetricsApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn for_timeframe(&self, timeframe: Timeframe) -> Result<Vec<PortfolioDailyMetric>> {
        self.for_timeframe_at(timeframe, Utc::now()).await
    }

    pub async fn for_timeframe_at(
        &self,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<Vec<PortfolioDailyMetric>> {
        let start = lookback_filter(timeframe, now)?;

        let mut query = self
            .client
            .from("portfolio_daily_metrics")
            .order("current_date", Order::Asc);
        if let Some(start) = start {
            query = query.gte("current_date", start);
        }
        query.fetch().await.during("fetch daily metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::client;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_year_to_date_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/portfolio_daily_metrics"))
            .and(query_param("order", "current_date.asc"))
            .and(query_param("current_date", "gte.2024-01-01T00:00:00.000Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"current_date": "2024-01-02", "user_id": "u-1", "cash_balance": 100.0,
                 "cost_basis": 900.0, "portfolio_value": 950.0, "previous_day_portfolio_value": null,
                 "total_portfolio_value": 1050.0, "daily_investment_twrr_percent": 0.4}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        let rows = DailyMetricsApi::new(&client)
            .for_timeframe_at(Timeframe::YearToDate, now)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_portfolio_value, Some(1050.0));
    }

    #[tokio::test]
    async fn test_error_is_prefixed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "canceling statement due to statement timeout"
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let err = DailyMetricsApi::new(&client)
            .for_timeframe(Timeframe::AllTime)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch daily metrics: canceling statement due to statement timeout"
        );
    }
}
