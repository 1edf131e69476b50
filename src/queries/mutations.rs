//! Writes, each followed by invalidation of the queries it affects.
//!
//! Once a write has been accepted by the backend its result is returned even
//! if invalidation fails; the failure is logged and stale entries expire on
//! their own.

use super::QueryClient;
use crate::api::receipts::{self, ReceiptItem, UpdateReceipt, UpdateReceiptItem};
use crate::api::tickers::{self, InsertTicker, Ticker, UpdateTicker};
use crate::api::trades::{self, InsertTrade, Trade, UpdateTrade};
use crate::api::users::{self, UpdateUser, User};
use crate::api::{daily_metrics, holdings, market_indices, spending};
use crate::core::error::Result;
use crate::core::query::QueryKey;
use tracing::{info, warn};

fn portfolio_keys() -> [QueryKey; 3] {
    [
        trades::keys::all(),
        holdings::keys::all(),
        daily_metrics::keys::all(),
    ]
}

fn receipt_keys() -> [QueryKey; 2] {
    [receipts::keys::all(), spending::keys::all()]
}

fn ticker_keys() -> [QueryKey; 2] {
    [tickers::keys::all(), market_indices::keys::all()]
}

impl QueryClient {
    async fn invalidate_after_write(&self, prefixes: &[QueryKey]) {
        for prefix in prefixes {
            if let Err(e) = self.invalidate(prefix).await {
                warn!("Write succeeded but invalidating {} failed: {}", prefix, e);
            }
        }
    }

    pub async fn update_user(&self, update: &UpdateUser) -> Result<Option<User>> {
        let user = self.api().users().update(update).await?;
        self.invalidate_after_write(&[users::keys::all()]).await;
        Ok(user)
    }

    pub async fn add_trade(&self, trade: &InsertTrade) -> Result<()> {
        self.api().trades().add(trade).await?;
        self.invalidate_after_write(&portfolio_keys()).await;
        info!("Trade recorded");
        Ok(())
    }

    pub async fn update_trade(&self, trade: &UpdateTrade) -> Result<Option<Trade>> {
        let updated = self.api().trades().update(trade).await?;
        self.invalidate_after_write(&portfolio_keys()).await;
        Ok(updated)
    }

    pub async fn add_ticker(&self, ticker: &InsertTicker) -> Result<Ticker> {
        let added = self.api().tickers().add(ticker).await?;
        self.invalidate_after_write(&ticker_keys()).await;
        Ok(added)
    }

    pub async fn update_ticker(&self, ticker: &UpdateTicker) -> Result<Option<Ticker>> {
        let updated = self.api().tickers().update(ticker).await?;
        if updated.is_some() {
            self.invalidate_after_write(&ticker_keys()).await;
        }
        Ok(updated)
    }

    pub async fn delete_ticker(&self, id: &str) -> Result<()> {
        self.api().tickers().delete(id).await?;
        self.invalidate_after_write(&ticker_keys()).await;
        Ok(())
    }

    pub async fn update_receipt(&self, update: &UpdateReceipt) -> Result<()> {
        self.api().receipts().update(update).await?;
        self.invalidate_after_write(&receipt_keys()).await;
        Ok(())
    }

    pub async fn update_receipt_item(
        &self,
        update: &UpdateReceiptItem,
    ) -> Result<Option<Vec<ReceiptItem>>> {
        let items = self.api().receipts().update_item(update).await?;
        if items.is_some() {
            self.invalidate_after_write(&receipt_keys()).await;
        }
        Ok(items)
    }

    pub async fn set_item_category(&self, item_id: &str, category_id: Option<&str>) -> Result<()> {
        self.api()
            .receipts()
            .set_item_category(item_id, category_id)
            .await?;
        self.invalidate_after_write(&receipt_keys()).await;
        Ok(())
    }

    pub async fn delete_receipt(&self, receipt_id: &str) -> Result<()> {
        self.api().receipts().delete(receipt_id).await?;
        self.invalidate_after_write(&receipt_keys()).await;
        Ok(())
    }
}
