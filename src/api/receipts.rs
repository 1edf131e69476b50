//! Receipts and their line items in the `spending` schema, plus receipt images
//! in object storage.

use crate::api::SPENDING_SCHEMA;
use crate::backend::{Order, RestClient};
use crate::core::currency::Currency;
use crate::core::error::{Error, Result, ResultExt};
use crate::core::timeframe::{DateRange, Timeframe};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const IMAGE_BUCKET: &str = "receipts";
const IMAGE_URL_TTL_SECS: u64 = 3600;
const RECENT_LIMIT: usize = 5;

const RECEIPT_WITH_ITEMS: &str = "
    id, store_name, purchase_date, total_amount, total_discount, currency_code,
    receipt_image_path, tax_amount,
    receipt_items (
        id, item_name, readable_name, quantity, discount_amount, is_discounted,
        original_unit_price, unit_price, total_price, category_id,
        categories!inner ( name )
    )";

const CATEGORY_RECEIPTS: &str = "
    id, store_name, purchase_date, currency_code, total_amount,
    receipt_items!inner ( id, receipt_id, readable_name, total_price, quantity, unit_price )";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Receipt {
    pub id: String,
    pub store_name: Option<String>,
    pub purchase_date: String,
    pub total_amount: f64,
    #[serde(default)]
    pub total_discount: f64,
    pub currency_code: Currency,
    pub receipt_image_path: Option<String>,
    pub tax_amount: Option<f64>,
    pub user_id: Option<String>,
}

/// Row of `receipt_items`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReceiptItem {
    pub id: String,
    pub receipt_id: Option<String>,
    pub item_name: String,
    pub readable_name: Option<String>,
    pub quantity: Option<f64>,
    pub discount_amount: Option<f64>,
    pub is_discounted: Option<bool>,
    pub original_unit_price: Option<f64>,
    pub unit_price: f64,
    pub total_price: Option<f64>,
    pub category_id: Option<String>,
}

/// A line item ready for display, with missing values filled in.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReceiptLine {
    pub id: String,
    pub item_name: String,
    pub readable_name: String,
    pub quantity: f64,
    pub discount_amount: f64,
    pub is_discounted: bool,
    pub original_unit_price: f64,
    pub unit_price: f64,
    pub total_price: Option<f64>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReceiptWithItems {
    pub id: String,
    pub store_name: Option<String>,
    pub purchase_date: String,
    pub total_amount: f64,
    pub total_discount: f64,
    pub currency_code: Currency,
    pub receipt_image_path: Option<String>,
    pub tax_amount: Option<f64>,
    /// Signed URL for the receipt image, when one could be created.
    pub image_url: Option<String>,
    pub items: Vec<ReceiptLine>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryReceiptItem {
    pub id: String,
    pub readable_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryReceipt {
    pub id: String,
    pub store_name: Option<String>,
    pub purchase_date: String,
    pub currency_code: Currency,
    pub total_amount: f64,
    pub items: Vec<CategoryReceiptItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReceipt {
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReceiptItem {
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: 10,
            offset: 0,
        }
    }
}

#[derive(Deserialize)]
struct CategoryName {
    name: String,
}

#[derive(Deserialize)]
struct ItemRow {
    id: String,
    item_name: String,
    readable_name: Option<String>,
    quantity: Option<f64>,
    discount_amount: Option<f64>,
    is_discounted: Option<bool>,
    original_unit_price: Option<f64>,
    unit_price: f64,
    total_price: Option<f64>,
    category_id: Option<String>,
    categories: Option<CategoryName>,
}

impl From<ItemRow> for ReceiptLine {
    fn from(item: ItemRow) -> Self {
        ReceiptLine {
            id: item.id,
            item_name: item.item_name,
            readable_name: readable_or_placeholder(item.readable_name),
            quantity: item.quantity.unwrap_or(0.0),
            discount_amount: item.discount_amount.unwrap_or(0.0),
            is_discounted: item.is_discounted.unwrap_or(false),
            original_unit_price: item.original_unit_price.unwrap_or(0.0),
            unit_price: item.unit_price,
            total_price: item.total_price,
            category_id: item.category_id,
            category_name: item.categories.map(|c| c.name),
        }
    }
}

fn readable_or_placeholder(name: Option<String>) -> String {
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| "NA".to_string())
}

#[derive(Deserialize)]
struct ReceiptRow {
    id: String,
    store_name: Option<String>,
    purchase_date: String,
    total_amount: f64,
    #[serde(default)]
    total_discount: f64,
    currency_code: Currency,
    receipt_image_path: Option<String>,
    tax_amount: Option<f64>,
    #[serde(default)]
    receipt_items: Vec<ItemRow>,
}

impl From<ReceiptRow> for ReceiptWithItems {
    fn from(row: ReceiptRow) -> Self {
        ReceiptWithItems {
            id: row.id,
            store_name: row.store_name,
            purchase_date: row.purchase_date,
            total_amount: row.total_amount,
            total_discount: row.total_discount,
            currency_code: row.currency_code,
            receipt_image_path: row.receipt_image_path,
            tax_amount: row.tax_amount,
            image_url: None,
            items: row.receipt_items.into_iter().map(ReceiptLine::from).collect(),
        }
    }
}

#[derive(Deserialize)]
struct CategoryItemRow {
    id: String,
    readable_name: Option<String>,
    total_price: Option<f64>,
    quantity: Option<f64>,
    unit_price: f64,
}

#[derive(Deserialize)]
struct CategoryReceiptRow {
    id: String,
    store_name: Option<String>,
    purchase_date: String,
    currency_code: Currency,
    total_amount: f64,
    #[serde(default)]
    receipt_items: Vec<CategoryItemRow>,
}

impl From<CategoryReceiptRow> for CategoryReceipt {
    fn from(row: CategoryReceiptRow) -> Self {
        CategoryReceipt {
            id: row.id,
            store_name: row.store_name,
            purchase_date: row.purchase_date,
            currency_code: row.currency_code,
            total_amount: row.total_amount,
            items: row
                .receipt_items
                .into_iter()
                .map(|item| CategoryReceiptItem {
                    id: item.id,
                    readable_name: readable_or_placeholder(item.readable_name),
                    quantity: item.quantity.unwrap_or(0.0),
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                })
                .collect(),
        }
    }
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
        QueryKey::root("receipts")
    }

    pub fn timeframe(window: &str) -> QueryKey {
        all().with("timeframe").with(window)
    }

    pub fn detail(receipt_id: &str) -> QueryKey {
        all().with(receipt_id)
    }

    pub fn by_category(category_id: &str, window: &str) -> QueryKey {
        all().with("category").with(category_id).with(window)
    }

    pub fn recent(window: &str) -> QueryKey {
        all().with("recent").with(window)
    }
}

pub struct ReceiptsApi<'a> {
    client: &'a RestClient,
}

impl<'a> ReceiptsApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Receipts in the window, newest first, one page at a time.
    pub async fn with_items(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        page: Page,
    ) -> Result<Vec<ReceiptWithItems>> {
        let range = timeframe.range(date, None);
        let rows: Vec<ReceiptRow> = self
            .client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .select(RECEIPT_WITH_ITEMS)
            .gte("purchase_date", range.start)
            .lte("purchase_date", range.end)
            .order("purchase_date", Order::Desc)
            .range(page.offset, page.offset + page.limit.max(1) - 1)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(ReceiptWithItems::from).collect())
    }

    /// One receipt with its items and a signed image URL. No id, no request.
    pub async fn detail(&self, receipt_id: Option<&str>) -> Result<Option<ReceiptWithItems>> {
        let Some(receipt_id) = receipt_id else {
            return Ok(None);
        };
        let rows: Vec<ReceiptRow> = self
            .client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .select(RECEIPT_WITH_ITEMS)
            .eq("id", receipt_id)
            .fetch()
            .await?;
        let Some(row) = rows.into_iter().next() else {
            debug!("Receipt {} not found", receipt_id);
            return Ok(None);
        };

        let mut receipt = ReceiptWithItems::from(row);
        if let Some(path) = receipt.receipt_image_path.as_deref() {
            receipt.image_url = self.image_url(path).await;
        }
        Ok(Some(receipt))
    }

    /// Receipts that contain at least one item in the category.
    pub async fn for_category(
        &self,
        category_id: &str,
        date: NaiveDate,
        timeframe: Timeframe,
        custom: Option<DateRange>,
    ) -> Result<Vec<CategoryReceipt>> {
        let range = timeframe.range(date, custom);
        let rows: Vec<CategoryReceiptRow> = self
            .client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .select(CATEGORY_RECEIPTS)
            .eq("receipt_items.category_id", category_id)
            .gte("purchase_date", range.start)
            .lte("purchase_date", range.end)
            .order("purchase_date", Order::Desc)
            .fetch()
            .await
            .during("load category receipts")?;
        Ok(rows.into_iter().map(CategoryReceipt::from).collect())
    }

    pub async fn update(&self, update: &UpdateReceipt) -> Result<()> {
        let id = update
            .id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("receipt update requires an id".to_string()))?;
        info!("Updating receipt {}", id);
        self.client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .update(update)?
            .eq("id", id)
            .execute()
            .await
    }

    /// Updates one item and returns the stored rows. Without an id nothing is sent.
    pub async fn update_item(
        &self,
        update: &UpdateReceiptItem,
    ) -> Result<Option<Vec<ReceiptItem>>> {
        let Some(id) = update.id.as_deref() else {
            return Ok(None);
        };
        let body = Stamped {
            fields: update,
            updated_at: Utc::now().to_rfc3339(),
        };
        self.client
            .from("receipt_items")
            .schema(SPENDING_SCHEMA)
            .update(&body)?
            .eq("id", id)
            .returning()
            .fetch()
            .await
            .map(Some)
    }

    /// Moves an item to a category, or clears its category with `None`.
    pub async fn set_item_category(&self, item_id: &str, category_id: Option<&str>) -> Result<()> {
        self.client
            .from("receipt_items")
            .schema(SPENDING_SCHEMA)
            .update(&serde_json::json!({ "category_id": category_id }))?
            .eq("id", item_id)
            .execute()
            .await
    }

    pub async fn delete(&self, receipt_id: &str) -> Result<()> {
        info!("Deleting receipt {}", receipt_id);
        self.client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .delete()
            .eq("id", receipt_id)
            .execute()
            .await
    }

    /// Signed URL for a stored receipt image. Failures are logged, not returned.
    pub async fn image_url(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return None;
        }
        match self
            .client
            .signed_url(IMAGE_BUCKET, path, IMAGE_URL_TTL_SECS)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Failed to create signed URL for {}: {}", path, e);
                None
            }
        }
    }

    /// The five newest receipts in the window.
    pub async fn recent(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        custom: Option<DateRange>,
    ) -> Result<Vec<Receipt>> {
        let range = timeframe.range(date, custom);
        self.client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .select("id, purchase_date, total_amount, store_name, currency_code")
            .gte("purchase_date", range.start)
            .lte("purchase_date", range.end)
            .order("purchase_date", Order::Desc)
            .limit(RECENT_LIMIT)
            .fetch()
            .await
            .during("fetch receipts")
    }
}
