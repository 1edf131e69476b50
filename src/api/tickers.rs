use crate::backend::{Order, RestClient};
use crate::core::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_PAGE_SIZE: usize = 20;
const DUPLICATE_TICKER: &str = "This ticker already exists in the database";
const DUPLICATE_SYMBOL: &str = "This ticker symbol and exchange combination already exists";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticker {
    pub id: String,
    pub symbol: String,
    pub exchange: Option<String>,
    pub name: Option<String>,
    pub quote_type: String,
    pub currency: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub sector_id: Option<String>,
    pub industry_id: Option<String>,
    pub tradeable: Option<bool>,
    #[serde(default)]
    pub backfill: bool,
    pub dividend_amount: Option<f64>,
    pub dividend_months: Option<Vec<u32>>,
    pub long_business_summary: Option<String>,
    pub market_last_updated_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickerFilters {
    pub tradeable: Option<bool>,
    pub sector_id: Option<String>,
    pub industry_id: Option<String>,
    pub quote_type: Option<String>,
    /// Case-insensitive match on symbol or name.
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertTicker {
    pub symbol: String,
    pub quote_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradeable: Option<bool>,
    pub backfill: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateTicker {
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradeable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfill: Option<bool>,
}

#[derive(Serialize)]
struct Stamped<'a> {
    #[serde(flatten)]
    fields: &'a UpdateTicker,
    updated_at: String,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

impl TickerFilters {
    fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub mod keys {
    use super::TickerFilters;
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("tickers")
    }

    pub fn list(filters: &TickerFilters) -> QueryKey {
        all().with("list").with(filters.cache_key())
    }

    pub fn detail(exchange: &str, symbol: &str) -> QueryKey {
        all().with("detail").with(exchange).with(symbol)
    }

    pub fn by_id(id: &str) -> QueryKey {
        all().with("detail").with(id)
    }

    pub fn sector(sector_key: &str) -> QueryKey {
        all().with("sector").with(sector_key)
    }

    pub fn industry(industry_key: &str) -> QueryKey {
        all().with("industry").with(industry_key)
    }
}

pub struct TickersApi<'a> {
    client: &'a RestClient,
}

impl<'a> TickersApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &TickerFilters) -> Result<Vec<Ticker>> {
        let mut query = self.client.from("tickers");

        if let Some(tradeable) = filters.tradeable {
            query = query.eq("tradeable", tradeable);
        }
        if let Some(sector_id) = &filters.sector_id {
            query = query.eq("sector_id", sector_id);
        }
        if let Some(industry_id) = &filters.industry_id {
            query = query.eq("industry_id", industry_id);
        }
        if let Some(quote_type) = &filters.quote_type {
            query = query.eq("quote_type", quote_type);
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.or(&format!("symbol.ilike.*{search}*,name.ilike.*{search}*"));
        }

        let direction = if filters.descending {
            Order::Desc
        } else {
            Order::Asc
        };
        query = query.order(filters.sort_by.as_deref().unwrap_or("symbol"), direction);

        match (filters.offset.filter(|o| *o > 0), filters.limit) {
            (Some(offset), limit) => {
                let size = limit.unwrap_or(DEFAULT_PAGE_SIZE);
                query = query.range(offset, offset + size.max(1) - 1);
            }
            (None, Some(limit)) => query = query.limit(limit),
            (None, None) => {}
        }

        query.fetch().await
    }

    pub async fn by_symbol(&self, exchange: &str, symbol: &str) -> Result<Option<Ticker>> {
        self.client
            .from("tickers")
            .eq("symbol", symbol)
            .eq("exchange", exchange)
            .fetch_single()
            .await
    }

    pub async fn by_id(&self, id: &str) -> Result<Option<Ticker>> {
        self.client
            .from("tickers")
            .eq("id", id)
            .fetch_single()
            .await
    }

    pub async fn by_sector_id(&self, sector_id: &str) -> Result<Vec<Ticker>> {
        self.client
            .from("tickers")
            .eq("sector_id", sector_id)
            .order("symbol", Order::Asc)
            .fetch()
            .await
    }

    pub async fn by_industry_id(&self, industry_id: &str) -> Result<Vec<Ticker>> {
        self.client
            .from("tickers")
            .eq("industry_id", industry_id)
            .order("symbol", Order::Asc)
            .fetch()
            .await
    }

    /// Tradeable tickers of the sector with this key. An unknown key has none.
    pub async fn tradeable_in_sector(&self, sector_key: &str) -> Result<Vec<Ticker>> {
        self.tradeable_in("sectors", "sector_id", sector_key).await
    }

    /// Tradeable tickers of the industry with this key. An unknown key has none.
    pub async fn tradeable_in_industry(&self, industry_key: &str) -> Result<Vec<Ticker>> {
        self.tradeable_in("industries", "industry_id", industry_key).await
    }

    async fn tradeable_in(&self, relation: &str, column: &str, key: &str) -> Result<Vec<Ticker>> {
        let parent: Option<IdOnly> = self
            .client
            .from(relation)
            .select("id")
            .eq("key", key)
            .fetch_single()
            .await?;
        let Some(parent) = parent else {
            debug!("No {} row with key {}", relation, key);
            return Ok(Vec::new());
        };

        self.client
            .from("tickers")
            .eq(column, parent.id)
            .eq("tradeable", true)
            .order("symbol", Order::Asc)
            .fetch()
            .await
    }

    pub async fn add(&self, ticker: &InsertTicker) -> Result<Ticker> {
        info!("Adding ticker {:?}:{}", ticker.exchange, ticker.symbol);
        let result = self
            .client
            .from("tickers")
            .insert(ticker)?
            .returning()
            .fetch_single()
            .await;

        match result {
            Ok(Some(ticker)) => Ok(ticker),
            Ok(None) => Err(Error::InvalidInput(format!(
                "ticker {} was not returned after insert",
                ticker.symbol
            ))),
            Err(e) if e.remote().is_some_and(|r| r.is_unique_violation()) => {
                Err(Error::Conflict(DUPLICATE_TICKER.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Applies a partial update and stamps `updated_at`. Without an id
    /// nothing is sent and the result is `None`.
    pub async fn update(&self, ticker: &UpdateTicker) -> Result<Option<Ticker>> {
        let Some(id) = ticker.id.as_deref() else {
            return Ok(None);
        };
        let body = Stamped {
            fields: ticker,
            updated_at: Utc::now().to_rfc3339(),
        };
        debug!("Updating ticker {}", id);

        let result = self
            .client
            .from("tickers")
            .update(&body)?
            .eq("id", id)
            .returning()
            .fetch_single()
            .await;

        match result {
            Err(e) if e.remote().is_some_and(|r| r.is_unique_violation()) => {
                Err(Error::Conflict(DUPLICATE_SYMBOL.to_string()))
            }
            other => other,
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        info!("Deleting ticker {}", id);
        self.client
            .from("tickers")
            .delete()
            .eq("id", id)
            .execute()
            .await
    }
}
