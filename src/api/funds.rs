//! Fund composition: top holdings, sector weightings and asset classes.

use crate::backend::{Order, RestClient};
use crate::core::error::{Result, ResultExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopHolding {
    pub id: String,
    pub ticker_id: String,
    pub holding_name: String,
    pub holding_symbol: String,
    pub weight: f64,
    pub date: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SectorWeighting {
    pub id: String,
    pub ticker_id: String,
    pub sector_name: String,
    pub weight: f64,
    pub date: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssetClass {
    pub id: String,
    pub ticker_id: String,
    pub asset_class: String,
    pub weight: f64,
    pub date: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("funds")
    }

    pub fn top_holdings(ticker_id: &str) -> QueryKey {
        all().with("topHoldings").with(ticker_id)
    }

    pub fn sector_weightings(ticker_id: &str) -> QueryKey {
        all().with("sectorWeightings").with(ticker_id)
    }

    pub fn asset_classes(ticker_id: &str) -> QueryKey {
        all().with("assetClasses").with(ticker_id)
    }
}

pub struct FundsApi<'a> {
    client: &'a RestClient,
}

impl<'a> FundsApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Rows of a fund table for one ticker, heaviest first. No ticker, no request.
    async fn by_weight<T: DeserializeOwned>(
        &self,
        relation: &str,
        ticker_id: Option<&str>,
        action: &'static str,
    ) -> Result<Vec<T>> {
        let Some(ticker_id) = ticker_id else {
            return Ok(Vec::new());
        };
        self.client
            .from(relation)
            .order("weight", Order::Desc)
            .eq("ticker_id", ticker_id)
            .fetch()
            .await
            .during(action)
    }

    pub async fn top_holdings(&self, ticker_id: Option<&str>) -> Result<Vec<TopHolding>> {
        self.by_weight("fund_top_holdings", ticker_id, "fetch top holdings")
            .await
    }

    pub async fn sector_weightings(&self, ticker_id: Option<&str>) -> Result<Vec<SectorWeighting>> {
        self.by_weight(
            "fund_sector_weightings",
            ticker_id,
            "fetch sector weightings",
        )
        .await
    }

    pub async fn asset_classes(&self, ticker_id: Option<&str>) -> Result<Vec<AssetClass>> {
        self.by_weight("fund_asset_classes", ticker_id, "fetch asset classes")
            .await
    }
}
