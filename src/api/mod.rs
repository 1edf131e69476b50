//! Typed data access, one module per domain.
//!
//! Each module pairs an API struct borrowing the [`RestClient`] with a `keys`
//! factory that names its cache entries. A function issues at most one
//! request per relation; functions that take an optional identifier return
//! an empty result without touching the network when it is absent.

pub mod calendar_events;
pub mod daily_metrics;
pub mod forex;
pub mod funds;
pub mod holdings;
pub mod industries;
pub mod market_indices;
pub mod portfolios;
pub mod prices;
pub mod receipts;
pub mod sectors;
pub mod spending;
pub mod tickers;
pub mod trades;
pub mod users;

use crate::backend::RestClient;
use crate::core::error::Result;
use crate::core::timeframe::{DateRange, Timeframe};
use chrono::{DateTime, SecondsFormat, Utc};

pub(crate) const SPENDING_SCHEMA: &str = "spending";

/// `gte` bound for a lookback window, or `None` when it is unbounded.
pub(crate) fn lookback_filter(timeframe: Timeframe, now: DateTime<Utc>) -> Result<Option<String>> {
    Ok(timeframe
        .lookback_start(now)?
        .map(|start| start.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

/// Cache key segment for a timeframe resolved to concrete dates.
pub fn window_key(timeframe: Timeframe, range: &DateRange) -> String {
    format!("{}:{}", timeframe, range.cache_key())
}

/// Every domain API over one shared client.
pub struct Api {
    client: RestClient,
}

impl Api {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn funds(&self) -> funds::FundsApi<'_> {
        funds::FundsApi::new(&self.client)
    }

    pub fn holdings(&self) -> holdings::HoldingsApi<'_> {
        holdings::HoldingsApi::new(&self.client)
    }

    pub fn portfolios(&self) -> portfolios::PortfoliosApi<'_> {
        portfolios::PortfoliosApi::new(&self.client)
    }

    pub fn users(&self) -> users::UsersApi<'_> {
        users::UsersApi::new(&self.client)
    }

    pub fn trades(&self) -> trades::TradesApi<'_> {
        trades::TradesApi::new(&self.client)
    }

    pub fn tickers(&self) -> tickers::TickersApi<'_> {
        tickers::TickersApi::new(&self.client)
    }

    pub fn prices(&self) -> prices::PricesApi<'_> {
        prices::PricesApi::new(&self.client)
    }

    pub fn daily_metrics(&self) -> daily_metrics::DailyMetricsApi<'_> {
        daily_metrics::DailyMetricsApi::new(&self.client)
    }

    pub fn sectors(&self) -> sectors::SectorsApi<'_> {
        sectors::SectorsApi::new(&self.client)
    }

    pub fn industries(&self) -> industries::IndustriesApi<'_> {
        industries::IndustriesApi::new(&self.client)
    }

    pub fn market_indices(&self) -> market_indices::MarketIndicesApi<'_> {
        market_indices::MarketIndicesApi::new(&self.client)
    }

    pub fn calendar_events(&self) -> calendar_events::CalendarEventsApi<'_> {
        calendar_events::CalendarEventsApi::new(&self.client)
    }

    pub fn forex(&self) -> forex::ForexApi<'_> {
        forex::ForexApi::new(&self.client)
    }

    pub fn spending(&self) -> spending::SpendingApi<'_> {
        spending::SpendingApi::new(&self.client)
    }

    pub fn receipts(&self) -> receipts::ReceiptsApi<'_> {
        receipts::ReceiptsApi::new(&self.client)
    }
}
