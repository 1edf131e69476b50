//! Spending aggregates over the receipts kept in the `spending` schema.

use crate::api::SPENDING_SCHEMA;
use crate::backend::{Order, RestClient};
use crate::core::currency::Currency;
use crate::core::error::{Result, ResultExt};
use crate::core::timeframe::{DateRange, Timeframe};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpendingCategory {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CurrencyBreakdown {
    pub currency: Currency,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpendingSummary {
    pub currency_breakdown: Vec<CurrencyBreakdown>,
    pub receipt_count: usize,
}

/// Spending for one day (`YYYY-MM-DD`) or month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub amounts: Vec<CurrencyBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryData {
    pub id: String,
    pub name: String,
    pub amounts: Vec<CurrencyBreakdown>,
}

/// Adds to the bucket for `currency`, keeping buckets in first-seen order.
fn accumulate(buckets: &mut Vec<CurrencyBreakdown>, currency: Currency, amount: f64) {
    match buckets.iter_mut().find(|b| b.currency == currency) {
        Some(bucket) => bucket.amount += amount,
        None => buckets.push(CurrencyBreakdown { currency, amount }),
    }
}

#[derive(Deserialize)]
struct ReceiptTotal {
    total_amount: Option<f64>,
    currency_code: Currency,
}

#[derive(Deserialize)]
struct DailySpending {
    date: Option<String>,
    total_amount: Option<f64>,
    currency_code: Option<Currency>,
}

#[derive(Deserialize)]
struct CategoryRef {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ReceiptRef {
    currency_code: Currency,
}

#[derive(Deserialize)]
struct CategorizedItem {
    categories: Option<CategoryRef>,
    total_price: Option<f64>,
    receipts: Option<ReceiptRef>,
}

pub fn summarize(receipts: &[(Currency, f64)]) -> SpendingSummary {
    let mut currency_breakdown = Vec::new();
    for (currency, amount) in receipts {
        accumulate(&mut currency_breakdown, *currency, *amount);
    }
    SpendingSummary {
        currency_breakdown,
        receipt_count: receipts.len(),
    }
}

pub mod keys {
    use crate::core::query::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::root("spending")
    }

    pub fn summary(window: &str) -> QueryKey {
        all().with("summary").with(window)
    }

    pub fn time_series(window: &str) -> QueryKey {
        all().with("timeSeries").with(window)
    }

    pub fn category_list() -> QueryKey {
        all().with("categories").with("list")
    }

    pub fn categories_detail(window: &str) -> QueryKey {
        all().with("categories").with("detail").with(window)
    }
}

pub struct SpendingApi<'a> {
    client: &'a RestClient,
}

impl<'a> SpendingApi<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Receipt totals per currency, in the order currencies first appear.
    pub async fn summary(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        custom: Option<DateRange>,
    ) -> Result<SpendingSummary> {
        let range = timeframe.range(date, custom);
        let rows: Vec<ReceiptTotal> = self
            .client
            .from("receipts")
            .schema(SPENDING_SCHEMA)
            .select("total_amount, id, currency_code")
            .gte("purchase_date", range.start)
            .lte("purchase_date", range.end)
            .fetch()
            .await
            .during("load spending summary")?;

        let totals: Vec<(Currency, f64)> = rows
            .into_iter()
            .map(|r| (r.currency_code, r.total_amount.unwrap_or(0.0)))
            .collect();
        Ok(summarize(&totals))
    }

    /// Daily totals, or monthly ones for quarter, year and all-time windows.
    pub async fn time_series(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        custom: Option<DateRange>,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let range = timeframe.range(date, custom);
        let by_month = timeframe.groups_by_month();

        let rows: Vec<DailySpending> = self
            .client
            .from("daily_spending")
            .schema(SPENDING_SCHEMA)
            .select("date, total_amount, currency_code")
            .gte("date", range.start)
            .lte("date", range.end)
            .order("date", Order::Asc)
            .fetch()
            .await
            .during("load spending time series")?;

        let mut periods: BTreeMap<String, Vec<CurrencyBreakdown>> = BTreeMap::new();
        for row in rows {
            let Some(day) = row.date else {
                continue;
            };
            let period = if by_month {
                day.chars().take(7).collect()
            } else {
                day
            };
            let amount = row.total_amount.unwrap_or(0.0);
            let buckets = periods.entry(period).or_default();
            match row.currency_code {
                Some(currency) => accumulate(buckets, currency, amount),
                // The period is kept; the amount has no currency to land in.
                None => debug!("Skipping {} spent without a currency", amount),
            }
        }

        Ok(periods
            .into_iter()
            .map(|(period, amounts)| TimeSeriesPoint { period, amounts })
            .collect())
    }

    /// Item totals per category and currency. Items without a category or
    /// receipt are skipped.
    pub async fn categories_detail(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        custom: Option<DateRange>,
    ) -> Result<Vec<CategoryData>> {
        let range = timeframe.range(date, custom);
        let rows: Vec<CategorizedItem> = self
            .client
            .from("receipt_items")
            .schema(SPENDING_SCHEMA)
            .select(
                "categories(id, name), total_price, category_id, receipts(currency_code, purchase_date)",
            )
            .gte("receipts.purchase_date", range.start)
            .lte("receipts.purchase_date", range.end)
            .fetch()
            .await
            .during("load category spending")?;

        let mut categories: Vec<CategoryData> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in rows {
            let (Some(category), Some(receipt)) = (row.categories, row.receipts) else {
                continue;
            };
            let slot = *index.entry(category.id.clone()).or_insert_with(|| {
                categories.push(CategoryData {
                    id: category.id,
                    name: category.name,
                    amounts: Vec::new(),
                });
                categories.len() - 1
            });
            accumulate(
                &mut categories[slot].amounts,
                receipt.currency_code,
                row.total_price.unwrap_or(0.0),
            );
        }
        Ok(categories)
    }

    pub async fn categories(&self) -> Result<Vec<SpendingCategory>> {
        self.client
            .from("categories")
            .schema(SPENDING_SCHEMA)
            .fetch()
            .await
            .during("fetch spending categories")
    }
}
