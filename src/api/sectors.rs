use crate::api::industries::Industry;
use crate::backend::{Order, RestClient};
use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sector {
    pub id: String,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub companies_count: Option<i64>,
    pub employee_count: Option<i64>,
    pub market_cap: Option<f64>,
    pub market_weight: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SectorWithIndustries {
    #[serde(flatten)]
    pub sector: Sector,
    pub industries: Vec<Industry>,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("sectors")
    }

    pub fn detail(key: &str) -> QueryKey {
        all().with(key)
    }

    pub fn with_industries(key: &str) -> QueryKey {
        detail(key).with("industries")
    }
}

pub struct SectorsApi<'a> {
    client: &'a RestClient,
}

impl<'a> SectorsApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn all(&self) -> Result<Vec<Sector>> {
        self.client
            .from("sectors")
            .order("name", Order::Asc)
            .fetch()
            .await
    }

    pub async fn by_key(&self, key: &str) -> Result<Option<Sector>> {
        self.client
            .from("sectors")
            .eq("key", key)
            .fetch_single()
            .await
    }

    /// The sector and its industries sorted by name, or `None` for an unknown key.
    pub async fn with_industries(&self, key: &str) -> Result<Option<SectorWithIndustries>> {
        let Some(sector) = self.by_key(key).await? else {
            return Ok(None);
        };
        let industries: Vec<Industry> = self
            .client
            .from("industries")
            .eq("sector_id", &sector.id)
            .order("name", Order::Asc)
            .fetch()
            .await?;
        debug!("Sector {} has {} industries", key, industries.len());

        Ok(Some(SectorWithIndustries { sector, industries }))
    }
}
