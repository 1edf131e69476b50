use crate::backend::RestClient;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};

/// A position as computed by the `current_holdings` view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Holding {
    pub ticker_id: Option<String>,
    pub user_id: Option<String>,
    pub symbol: Option<String>,
    pub exchange: Option<String>,
    pub name: Option<String>,
    pub quote_type: Option<String>,
    pub region: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub shares: Option<f64>,
    pub average_cost_basis: Option<f64>,
    pub total_cost_basis: Option<f64>,
    pub current_price: Option<f64>,
    pub current_market_value: Option<f64>,
    pub latest_price_date: Option<String>,
    pub price_change_1d_percent: Option<f64>,
    pub unrealized_gain_loss: Option<f64>,
    pub unrealized_gain_loss_percent: Option<f64>,
    pub total_gain_loss: Option<f64>,
    pub total_gain_loss_percent: Option<f64>,
    pub total_dividends_received: Option<f64>,
    pub dividend_amount: Option<f64>,
    pub annual_dividend_amount: Option<f64>,
    pub market_dividend_yield_percent: Option<f64>,
    pub cost_basis_dividend_yield_percent: Option<f64>,
    pub high_52_week: Option<f64>,
    pub low_52_week: Option<f64>,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("holdings")
    }

    pub fn ticker(exchange: &str, symbol: &str) -> QueryKey {
        all().with(exchange).with(symbol)
    }
}

pub struct HoldingsApi<'a> {
    client: &'a RestClient,
}

impl<'a> HoldingsApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn all(&self) -> Result<Vec<Holding>> {
        self.client.from("current_holdings").fetch().await
    }

    /// The holding for one listing, or `None` when it is not held.
    pub async fn by_ticker(&self, exchange: &str, symbol: &str) -> Result<Option<Holding>> {
        self.client
            .from("current_holdings")
            .eq("exchange", exchange)
            .eq("symbol", symbol)
            .fetch_single()
            .await
    }
}
