use crate::api::sectors::Sector;
use crate::backend::{Order, RestClient};
use crate::core::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Industry {
    pub id: String,
    pub key: String,
    pub name: String,
    pub sector_id: String,
    pub description: Option<String>,
    pub companies_count: Option<i64>,
    pub employee_count: Option<i64>,
    pub market_cap: Option<f64>,
    pub market_weight: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// An industry with its parent sector embedded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndustryWithSector {
    #[serde(flatten)]
    pub industry: Industry,
    #[serde(rename = "sectors")]
    pub sector: Option<Sector>,
}

#[derive(Deserialize)]
struct SectorId {
    id: String,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("industries")
    }

    pub fn by_sector(sector_key: &str) -> QueryKey {
        all().with("sector").with(sector_key)
    }

    pub fn detail(key: &str) -> QueryKey {
        all().with(key)
    }
}

pub struct IndustriesApi<'a> {
    client: &'a RestClient,
}

impl<'a> IndustriesApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn all(&self) -> Result<Vec<Industry>> {
        self.client
            .from("industries")
            .order("name", Order::Asc)
            .fetch()
            .await
    }

    /// Industries of a sector. An unknown sector has none.
    pub async fn by_sector(&self, sector_key: &str) -> Result<Vec<Industry>> {
        let sector: Option<SectorId> = self
            .client
            .from("sectors")
            .select("id")
            .eq("key", sector_key)
            .fetch_single()
            .await?;
        let Some(sector) = sector else {
            return Ok(Vec::new());
        };

        self.client
            .from("industries")
            .eq("sector_id", sector.id)
            .order("name", Order::Asc)
            .fetch()
            .await
    }

    pub async fn by_key(&self, key: &str) -> Result<Option<IndustryWithSector>> {
        self.client
            .from("industries")
            .select("*, sectors:sector_id (*)")
            .eq("key", key)
            .fetch_single()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sectors::fixtures::{industry, sector};
    use crate::backend::testing::{client, not_found_body};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_by_key_embeds_sector() {
        let server = MockServer::start().await;
        let mut body = industry("i1", "semiconductors", "Semiconductors", "s1");
        body["sectors"] = sector("s1", "technology", "Technology");

        Mock::given(method("GET"))
            .and(path("/rest/v1/industries"))
            .and(query_param("select", "*,sectors:sector_id(*)"))
            .and(query_param("key", "eq.semiconductors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let result = IndustriesApi::new(&client)
            .by_key("semiconductors")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.industry.name, "Semiconductors");
        assert_eq!(result.sector.map(|s| s.key), Some("technology".to_string()));
    }

    #[tokio::test]
    async fn test_by_unknown_sector_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sectors"))
            .and(query_param("select", "id"))
            .respond_with(ResponseTemplate::new(406).set_body_json(not_found_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/industries"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let industries = IndustriesApi::new(&client).by_sector("nope").await.unwrap();
        assert!(industries.is_empty());
    }
}
