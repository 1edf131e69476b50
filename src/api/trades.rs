//! Buy/sell/dividend/cash transactions.

use crate::backend::{Order, RestClient};
use crate::core::currency::Currency;
use crate::core::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, info};

const DUPLICATE_TRADE: &str = "This ticker symbol and exchange combination already exists";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Sell => "sell",
            TransactionType::Dividend => "dividend",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TransactionType::Buy),
            "sell" => Ok(TransactionType::Sell),
            "dividend" => Ok(TransactionType::Dividend),
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            other => Err(Error::InvalidInput(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// Row of the `transactions` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub ticker_id: Option<String>,
    pub transaction_type: TransactionType,
    pub transaction_date: String,
    pub shares: Option<f64>,
    pub price_per_share: Option<f64>,
    pub transaction_fee: Option<f64>,
    pub currency: Currency,
    pub note_text: Option<String>,
    pub is_dividend_reinvestment: Option<bool>,
    pub settlement_date: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Row of the `trades_view` view: a transaction joined with its ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TradeView {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub ticker_id: Option<String>,
    pub symbol: Option<String>,
    pub exchange: Option<String>,
    pub ticker_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub transaction_category: Option<String>,
    pub transaction_date: Option<String>,
    pub settlement_date: Option<String>,
    pub shares: Option<f64>,
    pub price_per_share: Option<f64>,
    pub transaction_fee: Option<f64>,
    pub formatted_transaction_fee: Option<f64>,
    pub gross_transaction_amount: Option<f64>,
    pub total_cost_basis: Option<f64>,
    pub realized_gain_loss: Option<f64>,
    pub is_dividend_reinvestment: Option<bool>,
    pub note_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertTrade {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker_id: Option<String>,
    pub transaction_type: TransactionType,
    pub transaction_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_share: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_fee: Option<f64>,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dividend_reinvestment: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateTrade {
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_share: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_text: Option<String>,
}

#[derive(Serialize)]
struct Stamped<'a, T> {
    #[serde(flatten)]
    fields: &'a T,
    updated_at: String,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("trades")
    }

    pub fn ticker(exchange: &str, symbol: &str) -> QueryKey {
        all().with(exchange).with(symbol)
    }
}

pub struct TradesApi<'a> {
    client: &'a RestClient,
}

impl<'a> TradesApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Every trade, newest first.
    pub async fn all(&self) -> Result<Vec<TradeView>> {
        self.client
            .from("trades_view")
            .order("transaction_date", Order::Desc)
            .fetch()
            .await
    }

    pub async fn for_ticker(&self, exchange: &str, symbol: &str) -> Result<Vec<TradeView>> {
        self.client
            .from("trades_view")
            .eq("symbol", symbol)
            .eq("exchange", exchange)
            .order("transaction_date", Order::Desc)
            .fetch()
            .await
    }

    pub async fn add(&self, trade: &InsertTrade) -> Result<()> {
        info!(
            "Recording {} on {} for {:?}",
            trade.transaction_type, trade.transaction_date, trade.ticker_id
        );
        self.client
            .from("transactions")
            .insert(trade)?
            .execute()
            .await
    }

    /// Applies a partial update and stamps `updated_at`.
    pub async fn update(&self, trade: &UpdateTrade) -> Result<Option<Trade>> {
        let id = trade
            .id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("trade update requires an id".to_string()))?;
        let body = Stamped {
            fields: trade,
            updated_at: Utc::now().to_rfc3339(),
        };
        debug!("Updating trade {}", id);

        let result = self
            .client
            .from("transactions")
            .update(&body)?
            .eq("id", id)
            .returning()
            .fetch_single()
            .await;

        match result {
            Err(e) if e.remote().is_some_and(|r| r.is_unique_violation()) => {
                Err(Error::Conflict(DUPLICATE_TRADE.to_string()))
            }
            other => other,
        }
    }
}
