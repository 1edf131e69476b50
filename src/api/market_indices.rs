use crate::backend::RestClient;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};

const SECTOR_INDEX: &str = "SECTOR_INDEX";
const INDUSTRY_INDEX: &str = "INDUSTRY_INDEX";

/// Row of the `market_indices` view: a benchmark ticker tracking one sector
/// or industry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketIndex {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub exchange: Option<String>,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub quote_type: Option<String>,
    pub index_type: Option<String>,
    pub tradeable: Option<bool>,
    pub sector_id: Option<String>,
    pub sector_key: Option<String>,
    pub sector_name: Option<String>,
    pub industry_id: Option<String>,
    pub industry_key: Option<String>,
    pub industry_name: Option<String>,
    pub linked_sector_id: Option<String>,
    pub linked_industry_id: Option<String>,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("market-indices")
    }

    pub fn sector(sector_key: &str) -> QueryKey {
        all().with("sector").with(sector_key)
    }

    pub fn industry(industry_key: &str) -> QueryKey {
        all().with("industry").with(industry_key)
    }

    pub fn all_sectors() -> QueryKey {
        all().with("sectors")
    }

    pub fn all_industries() -> QueryKey {
        all().with("industries")
    }
}

pub struct MarketIndicesApi<'a> {
    client: &'a RestClient,
}

impl<'a> MarketIndicesApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn for_sector(&self, sector_key: &str) -> Result<Option<MarketIndex>> {
        self.client
            .from("market_indices")
            .eq("sector_key", sector_key)
            .eq("index_type", SECTOR_INDEX)
            .fetch_single()
            .await
    }

    pub async fn for_industry(&self, industry_key: &str) -> Result<Option<MarketIndex>> {
        self.client
            .from("market_indices")
            .eq("industry_key", industry_key)
            .eq("index_type", INDUSTRY_INDEX)
            .fetch_single()
            .await
    }

    pub async fn sectors(&self) -> Result<Vec<MarketIndex>> {
        self.client
            .from("market_indices")
            .eq("index_type", SECTOR_INDEX)
            .fetch()
            .await
    }

    pub async fn industries(&self) -> Result<Vec<MarketIndex>> {
        self.client
            .from("market_indices")
            .eq("index_type", INDUSTRY_INDEX)
            .fetch()
            .await
    }
}
