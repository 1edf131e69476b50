use crate::backend::RestClient;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Portfolio {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("portfolios")
    }

    pub fn user(user_id: &str) -> QueryKey {
        all().with(user_id)
    }
}

pub struct PortfoliosApi<'a> {
    client: &'a RestClient,
}

impl<'a> PortfoliosApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn all(&self) -> Result<Vec<Portfolio>> {
        self.client.from("portfolio").fetch().await
    }

    pub async fn for_user(&self, user_id: &str) -> Result<Option<Portfolio>> {
        self.client
            .from("portfolio")
            .eq("user_id", user_id)
            .fetch_single()
            .await
    }
}
