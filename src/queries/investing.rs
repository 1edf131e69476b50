use super::QueryClient;
use crate::api::calendar_events::{self, CalendarEvent};
use crate::api::daily_metrics::{self, PortfolioDailyMetric};
use crate::api::holdings::{self, Holding};
use crate::api::portfolios::{self, Portfolio};
use crate::api::prices::{self, HistoricalPrice};
use crate::api::trades::{self, TradeView};
use crate::api::users::{self, User};
use crate::core::analytics::PortfolioSummary;
use crate::core::error::Result;
use crate::core::query::QueryState;
use crate::core::timeframe::Timeframe;
use chrono::NaiveDate;

impl QueryClient {
    pub async fn holdings(&self) -> Result<Vec<Holding>> {
        let api = self.api();
        self.fetch(holdings::keys::all(), move || async move {
            api.holdings().all().await
        })
        .await
    }

    pub async fn ticker_holding(&self, exchange: &str, symbol: &str) -> Result<Option<Holding>> {
        let api = self.api();
        self.fetch(holdings::keys::ticker(exchange, symbol), move || async move {
            api.holdings().by_ticker(exchange, symbol).await
        })
        .await
    }

    pub async fn portfolios(&self) -> Result<Vec<Portfolio>> {
        let api = self.api();
        self.fetch(portfolios::keys::all(), move || async move {
            api.portfolios().all().await
        })
        .await
    }

    pub async fn user_portfolio(
        &self,
        user_id: Option<&str>,
    ) -> Result<QueryState<Option<Portfolio>>> {
        let Some(user_id) = user_id else {
            return Ok(QueryState::Idle);
        };
        let api = self.api();
        self.fetch(portfolios::keys::user(user_id), move || async move {
            api.portfolios().for_user(user_id).await
        })
        .await
        .map(QueryState::Ready)
    }

    pub async fn user(&self, user_id: Option<&str>) -> Result<QueryState<Option<User>>> {
        let Some(user_id) = user_id else {
            return Ok(QueryState::Idle);
        };
        let api = self.api();
        self.fetch(users::keys::detail(user_id), move || async move {
            api.users().get(Some(user_id)).await
        })
        .await
        .map(QueryState::Ready)
    }

    pub async fn trades(&self) -> Result<Vec<TradeView>> {
        let api = self.api();
        self.fetch(trades::keys::all(), move || async move {
            api.trades().all().await
        })
        .await
    }

    pub async fn ticker_trades(&self, exchange: &str, symbol: &str) -> Result<Vec<TradeView>> {
        let api = self.api();
        self.fetch(trades::keys::ticker(exchange, symbol), move || async move {
            api.trades().for_ticker(exchange, symbol).await
        })
        .await
    }

    pub async fn historical_prices(
        &self,
        ticker_id: Option<&str>,
        timeframe: Timeframe,
    ) -> Result<QueryState<Vec<HistoricalPrice>>> {
        let Some(ticker_id) = ticker_id else {
            return Ok(QueryState::Idle);
        };
        let api = self.api();
        self.fetch(prices::keys::timeframe(ticker_id, timeframe), move || async move {
            api.prices().historical(Some(ticker_id), timeframe).await
        })
        .await
        .map(QueryState::Ready)
    }

    pub async fn daily_metrics(&self, timeframe: Timeframe) -> Result<Vec<PortfolioDailyMetric>> {
        let api = self.api();
        self.fetch(daily_metrics::keys::timeframe(timeframe), move || async move {
            api.daily_metrics().for_timeframe(timeframe).await
        })
        .await
    }

    pub async fn portfolio_summary(&self, timeframe: Timeframe) -> Result<PortfolioSummary> {
        let metrics = self.daily_metrics(timeframe).await?;
        Ok(PortfolioSummary::from_daily_metrics(&metrics))
    }

    pub async fn upcoming_events(
        &self,
        today: NaiveDate,
        limit: usize,
        ticker_id: Option<&str>,
    ) -> Result<Vec<CalendarEvent>> {
        let api = self.api();
        let key = calendar_events::keys::upcoming(today, limit, ticker_id);
        self.fetch(key, move || async move {
            api.calendar_events().upcoming(today, limit, ticker_id).await
        })
        .await
    }

    pub async fn upcoming_events_for(
        &self,
        today: NaiveDate,
        limit: usize,
        ticker_ids: &[String],
    ) -> Result<Vec<CalendarEvent>> {
        if ticker_ids.is_empty() {
            return Ok(Vec::new());
        }
        let api = self.api();
        let key = calendar_events::keys::upcoming_for(today, limit, ticker_ids);
        self.fetch(key, move || async move {
            api.calendar_events()
                .upcoming_for(today, limit, ticker_ids)
                .await
        })
        .await
    }

    /// Upcoming events for the tickers currently held.
    pub async fn holdings_events(
        &self,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<CalendarEvent>> {
        let holdings = self.holdings().await?;
        let mut ticker_ids: Vec<String> = holdings
            .into_iter()
            .filter_map(|h| h.ticker_id)
            .collect();
        ticker_ids.sort();
        ticker_ids.dedup();
        self.upcoming_events_for(today, limit, &ticker_ids).await
    }
}
