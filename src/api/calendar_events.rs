//! Upcoming earnings and dividend dates.

use crate::backend::{Order, RestClient};
use crate::core::error::{Result, ResultExt};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LIMIT: usize = 5;

/// Row of the `calendar_events_with_tickers` view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub ticker_id: Option<String>,
    pub ticker_symbol: Option<String>,
    pub ticker_exchange: Option<String>,
    pub event_type: Option<String>,
    pub date: Option<String>,
    pub earnings_dates: Option<Vec<String>>,
    pub earnings_average: Option<f64>,
    pub earnings_high: Option<f64>,
    pub earnings_low: Option<f64>,
    pub revenue_average: Option<f64>,
    pub revenue_high: Option<f64>,
    pub revenue_low: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

pub mod keys {
    use crate::core::query::QueryKey;
    use chrono::NaiveDate;

    pub fn all() -> QueryKey {
        QueryKey::root("calendarEvents")
    }

    pub fn upcoming(today: NaiveDate, limit: usize, ticker_id: Option<&str>) -> QueryKey {
        let key = all().with("upcoming").with(today).with(limit);
        match ticker_id {
            Some(id) => key.with(id),
            None => key,
        }
    }

    pub fn upcoming_for(today: NaiveDate, limit: usize, ticker_ids: &[String]) -> QueryKey {
        all()
            .with("upcomingByTickerIds")
            .with(today)
            .with(limit)
            .with(ticker_ids.join(","))
    }
}

pub struct CalendarEventsApi<'a> {
    client: &'a RestClient,
}

impl<'a> CalendarEventsApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Events dated `today` or later, soonest first.
    pub async fn upcoming(
        &self,
        today: NaiveDate,
        limit: usize,
        ticker_id: Option<&str>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut query = self
            .client
            .from("calendar_events_with_tickers")
            .gte("date", today)
            .order("date", Order::Asc)
            .limit(limit);
        if let Some(ticker_id) = ticker_id {
            query = query.eq("ticker_id", ticker_id);
        }
        query.fetch().await.during("fetch upcoming events")
    }

    /// Upcoming events for any of `ticker_ids`. No ids means no events.
    pub async fn upcoming_for(
        &self,
        today: NaiveDate,
        limit: usize,
        ticker_ids: &[String],
    ) -> Result<Vec<CalendarEvent>> {
        if ticker_ids.is_empty() {
            debug!("No tickers given, skipping calendar lookup");
            return Ok(Vec::new());
        }
        self.client
            .from("calendar_events_with_tickers")
            .gte("date", today)
            .in_("ticker_id", ticker_ids)
            .order("date", Order::Asc)
            .limit(limit)
            .fetch()
            .await
            .during("fetch upcoming events by ticker ids")
    }
}
