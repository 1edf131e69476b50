use crate::backend::RestClient;
use crate::core::currency::Currency;
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_currency: Currency,
    pub tracking_ticker_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Partial update. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateUser {
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_ticker_id: Option<String>,
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("user")
    }

    pub fn detail(user_id: &str) -> QueryKey {
        all().with(user_id)
    }
}

pub struct UsersApi<'a> {
    client: &'a RestClient,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, user_id: Option<&str>) -> Result<Option<User>> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        self.client
            .from("users")
            .eq("id", user_id)
            .fetch_single()
            .await
    }

    pub async fn update(&self, update: &UpdateUser) -> Result<Option<User>> {
        let id = update
            .id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("user update requires an id".to_string()))?;
        debug!("Updating user {}", id);
        self.client
            .from("users")
            .update(update)?
            .eq("id", id)
            .returning()
            .fetch_single()
            .await
    }
}
