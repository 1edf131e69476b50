use super::QueryClient;
use crate::api::receipts::{self, CategoryReceipt, Page, Receipt, ReceiptWithItems};
use crate::api::spending::{self, CategoryData, SpendingCategory, SpendingSummary, TimeSeriesPoint};
use crate::api::window_key;
use crate::core::error::Result;
use crate::core::query::QueryState;
use crate::core::timeframe::{DateRange, Timeframe};
use chrono::NaiveDate;

/// A timeframe anchored at a date, with an optional explicit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub date: NaiveDate,
    pub timeframe: Timeframe,
    pub custom: Option<DateRange>,
}

impl Window {
    pub fn new(date: NaiveDate, timeframe: Timeframe) -> Self {
        Self {
            date,
            timeframe,
            custom: None,
        }
    }

    pub fn range(&self) -> DateRange {
        self.timeframe.range(self.date, self.custom)
    }

    fn key(&self) -> String {
        window_key(self.timeframe, &self.range())
    }
}

impl QueryClient {
    pub async fn spending_summary(&self, window: Window) -> Result<SpendingSummary> {
        let api = self.api();
        self.fetch(spending::keys::summary(&window.key()), move || async move {
            api.spending()
                .summary(window.date, window.timeframe, window.custom)
                .await
        })
        .await
    }

    pub async fn spending_time_series(&self, window: Window) -> Result<Vec<TimeSeriesPoint>> {
        let api = self.api();
        self.fetch(spending::keys::time_series(&window.key()), move || async move {
            api.spending()
                .time_series(window.date, window.timeframe, window.custom)
                .await
        })
        .await
    }

    pub async fn categories_detail(&self, window: Window) -> Result<Vec<CategoryData>> {
        let api = self.api();
        self.fetch(
            spending::keys::categories_detail(&window.key()),
            move || async move {
                api.spending()
                    .categories_detail(window.date, window.timeframe, window.custom)
                    .await
            },
        )
        .await
    }

    pub async fn spending_categories(&self) -> Result<Vec<SpendingCategory>> {
        let api = self.api();
        self.fetch(spending::keys::category_list(), move || async move {
            api.spending().categories().await
        })
        .await
    }

    pub async fn receipts(&self, window: Window, page: Page) -> Result<Vec<ReceiptWithItems>> {
        let api = self.api();
        let key = format!("{}:{}+{}", window.key(), page.offset, page.limit);
        self.fetch(receipts::keys::timeframe(&key), move || async move {
            api.receipts()
                .with_items(window.date, window.timeframe, page)
                .await
        })
        .await
    }

    pub async fn receipt(
        &self,
        receipt_id: Option<&str>,
    ) -> Result<QueryState<Option<ReceiptWithItems>>> {
        let Some(receipt_id) = receipt_id else {
            return Ok(QueryState::Idle);
        };
        let api = self.api();
        self.fetch(receipts::keys::detail(receipt_id), move || async move {
            api.receipts().detail(Some(receipt_id)).await
        })
        .await
        .map(QueryState::Ready)
    }

    pub async fn category_receipts(
        &self,
        category_id: &str,
        window: Window,
    ) -> Result<Vec<CategoryReceipt>> {
        let api = self.api();
        self.fetch(
            receipts::keys::by_category(category_id, &window.key()),
            move || async move {
                api.receipts()
                    .for_category(category_id, window.date, window.timeframe, window.custom)
                    .await
            },
        )
        .await
    }

    pub async fn recent_receipts(&self, window: Window) -> Result<Vec<Receipt>> {
        let api = self.api();
        self.fetch(receipts::keys::recent(&window.key()), move || async move {
            api.receipts()
                .recent(window.date, window.timeframe, window.custom)
                .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::receipts::fixtures::receipt;
    use crate::queries::testing::query_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn june() -> Window {
        Window::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), Timeframe::Month)
    }

    #[tokio::test]
    async fn test_receipt_idle_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        assert!(queries.receipt(None).await.unwrap().is_idle());
    }

    #[tokio::test]
    async fn test_windows_are_cached_separately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/receipts"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([receipt("r1", None)])),
            )
            .expect(2)
            .mount(&server)
            .await;

        let queries = query_client(&server.uri());
        let may = Window::new(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), Timeframe::Month);
        queries.receipts(june(), Page::default()).await.unwrap();
        queries.receipts(june(), Page::default()).await.unwrap();
        queries.receipts(may, Page::default()).await.unwrap();
    }

    #[test]
    fn test_custom_window_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
        );
        let window = Window {
            custom: Some(range),
            ..Window::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), Timeframe::Custom)
        };
        assert_eq!(window.range(), range);
    }
}
