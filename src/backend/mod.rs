//! Client for the hosted backend's REST interface (PostgREST conventions).
//!
//! Every API module builds one request through [`RestClient::from`]:
//!
//! ```no_run
//! # async fn demo(client: &mydash::backend::RestClient) -> mydash::core::error::Result<()> {
//! use mydash::backend::Order;
//! let rows: Vec<serde_json::Value> = client
//!     .from("fund_top_holdings")
//!     .eq("ticker_id", "f1c2")
//!     .order("weight", Order::Desc)
//!     .fetch()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod util;

use crate::core::config::BackendConfig;
use crate::core::error::{Error, RemoteError, Result};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, instrument};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("mydash/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(RestClient {
            http: builder.build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a request against a table or view.
    pub fn from(&self, relation: &str) -> QueryBuilder<'_> {
        QueryBuilder {
            client: self,
            relation: relation.to_string(),
            schema: None,
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            action: Action::Select,
            returning: false,
        }
    }

    /// Calls a database function with named arguments (`POST /rest/v1/rpc/{function}`).
    pub fn rpc<T: Serialize>(&self, function: &str, args: &T) -> Result<QueryBuilder<'_>> {
        let mut builder = self.from(&format!("rpc/{function}"));
        builder.action = Action::Call(builder.encode(args)?);
        Ok(builder)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    /// Creates a time-limited download URL for an object in a storage bucket.
    #[instrument(name = "SignStorageObject", skip(self))]
    pub async fn signed_url(&self, bucket: &str, path: &str, expires_in: u64) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct Signed {
            #[serde(rename = "signedURL", alias = "signedUrl")]
            signed_url: String,
        }

        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url,
            bucket,
            path.trim_start_matches('/')
        );
        debug!("Requesting signed URL from {}", url);

        let response = self
            .authorize(self.http.post(&url))
            .json(&serde_json::json!({ "expiresIn": expires_in }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Remote(remote_error(status, &body)));
        }

        let signed: Signed = serde_json::from_str(&body).map_err(|source| Error::Decode {
            relation: format!("storage/{bucket}"),
            source,
        })?;
        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug)]
enum Action {
    Select,
    Insert(serde_json::Value),
    Update(serde_json::Value),
    Delete,
    Call(serde_json::Value),
}

impl Action {
    fn method(&self) -> Method {
        match self {
            Action::Select => Method::GET,
            Action::Insert(_) | Action::Call(_) => Method::POST,
            Action::Update(_) => Method::PATCH,
            Action::Delete => Method::DELETE,
        }
    }
}

/// A single request against one relation. Terminal methods consume it.
pub struct QueryBuilder<'a> {
    client: &'a RestClient,
    relation: String,
    schema: Option<String>,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    action: Action,
    returning: bool,
}

impl<'a> QueryBuilder<'a> {
    /// Targets a schema other than the default `public`.
    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    /// Column list, including embedded relations such as `*, sectors:sector_id (*)`.
    /// Whitespace outside double quotes is dropped.
    pub fn select(mut self, columns: &str) -> Self {
        let mut quoted = false;
        let compact: String = columns
            .chars()
            .filter(|c| {
                if *c == '"' {
                    quoted = !quoted;
                }
                quoted || !c.is_whitespace()
            })
            .collect();
        self.columns = Some(compact);
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.filters
            .push((column.to_string(), format!("{op}.{value}")));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    /// Matches any of `values`. An empty list matches nothing.
    pub fn in_<V: Display>(self, column: &str, values: &[V]) -> Self {
        let list = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, "in", format!("({list})"))
    }

    /// Disjunction of filter expressions, e.g. `symbol.ilike.*app*,name.ilike.*app*`.
    pub fn or(mut self, expression: &str) -> Self {
        self.filters
            .push(("or".to_string(), format!("({expression})")));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        let direction = match order {
            Order::Asc => "asc",
            Order::Desc => "desc",
        };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Inclusive row range, zero based.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    pub fn insert<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.action = Action::Insert(self.encode(body)?);
        Ok(self)
    }

    pub fn update<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.action = Action::Update(self.encode(body)?);
        Ok(self)
    }

    pub fn delete(mut self) -> Self {
        self.action = Action::Delete;
        self
    }

    /// Asks a write to return the affected rows.
    pub fn returning(mut self) -> Self {
        self.returning = true;
        self
    }

    fn encode<T: Serialize>(&self, body: &T) -> Result<serde_json::Value> {
        serde_json::to_value(body).map_err(|source| Error::Decode {
            relation: self.relation.clone(),
            source,
        })
    }

    fn url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/rest/v1/{}",
            self.client.base_url, self.relation
        ))
        .map_err(|e| Error::InvalidInput(format!("Invalid backend URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            if matches!(self.action, Action::Select) || self.returning {
                pairs.append_pair("select", self.columns.as_deref().unwrap_or("*"));
            }
            for (column, value) in &self.filters {
                pairs.append_pair(column, value);
            }
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = self.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn request(&self, single: bool) -> Result<reqwest::RequestBuilder> {
        let method = self.action.method();
        let mut request = self
            .client
            .authorize(self.client.http.request(method.clone(), self.url()?));

        if let Some(schema) = &self.schema {
            let profile = if method == Method::GET {
                "Accept-Profile"
            } else {
                "Content-Profile"
            };
            request = request.header(profile, schema);
        }
        if single {
            request = request.header("Accept", SINGLE_OBJECT);
        }
        match &self.action {
            Action::Select => {}
            Action::Insert(body) | Action::Update(body) | Action::Call(body) => {
                request = request.json(body);
            }
            Action::Delete => {}
        }
        if method != Method::GET && !matches!(self.action, Action::Call(_)) {
            let prefer = if self.returning {
                "return=representation"
            } else {
                "return=minimal"
            };
            request = request.header("Prefer", prefer);
        }
        Ok(request)
    }

    #[instrument(
        name = "BackendRequest",
        skip(self),
        fields(relation = %self.relation, method = %self.action.method())
    )]
    async fn send(&self, single: bool) -> Result<String> {
        let request = self.request(single)?;
        debug!(filters = ?self.filters, "Sending request");

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "Received response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::Remote(remote_error(status, &body)))
        }
    }

    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|source| Error::Decode {
            relation: self.relation.clone(),
            source,
        })
    }

    /// Runs the request and decodes every returned row.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let body = self.send(false).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.decode(&body)
    }

    /// Runs the request expecting exactly one row. No match is `None`.
    pub async fn fetch_single<T: DeserializeOwned>(self) -> Result<Option<T>> {
        match self.send(true).await {
            Ok(body) => self.decode(&body).map(Some),
            Err(Error::Remote(remote)) if remote.is_not_found() => {
                debug!("No {} row matched {:?}", self.relation, self.filters);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a write and discards the response body.
    pub async fn execute(self) -> Result<()> {
        self.send(false).await.map(|_| ())
    }
}

fn remote_error(status: StatusCode, body: &str) -> RemoteError {
    let mut remote = serde_json::from_str::<RemoteError>(body)
        .ok()
        .filter(|r| !r.message.is_empty())
        .unwrap_or_else(|| RemoteError {
            message: if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            },
            ..Default::default()
        });
    remote.status = status.as_u16();
    remote
}


#[cfg(test)]
mod tests {
    use super::testing::{API_KEY, client, not_found_body};
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: String,
        weight: f64,
    }

    #[tokio::test]
    async fn test_fetch_sends_filters_order_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fund_top_holdings"))
            .and(query_param("select", "*"))
            .and(query_param("ticker_id", "eq.t-1"))
            .and(query_param("order", "weight.desc"))
            .and(header("apikey", API_KEY))
            .and(header("Authorization", format!("Bearer {API_KEY}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "a", "weight": 7.5},
                {"id": "b", "weight": 2.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Row> = client(&server.uri())
            .from("fund_top_holdings")
            .eq("ticker_id", "t-1")
            .order("weight", Order::Desc)
            .fetch()
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
    }

    #[tokio::test]
    async fn test_fetch_single_maps_no_rows_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/current_holdings"))
            .and(header("Accept", SINGLE_OBJECT))
            .respond_with(ResponseTemplate::new(406).set_body_json(not_found_body()))
            .mount(&server)
            .await;

        let row: Option<Row> = client(&server.uri())
            .from("current_holdings")
            .eq("symbol", "NOPE")
            .fetch_single()
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_remote_error_keeps_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/portfolio"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "42501",
                "message": "permission denied for table portfolio",
                "details": null,
                "hint": null
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .from("portfolio")
            .fetch::<Row>()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table portfolio");
        let remote = err.remote().unwrap();
        assert_eq!(remote.status, 401);
        assert_eq!(remote.code.as_deref(), Some("42501"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_becomes_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway upstream"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .from("users")
            .fetch::<Row>()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Bad gateway upstream");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_schema_profile_and_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/receipts"))
            .and(header("Accept-Profile", "spending"))
            .and(query_param("limit", "10"))
            .and(query_param("offset", "20"))
            .and(query_param("purchase_date", "gte.2024-05-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Row> = client(&server.uri())
            .from("receipts")
            .schema("spending")
            .gte("purchase_date", "2024-05-01")
            .range(20, 29)
            .fetch()
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_update_returning_sends_body_and_prefer() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", "eq.u-1"))
            .and(query_param("select", "*"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(serde_json::json!({"first_name": "Ada"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "u-1", "weight": 0.0})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let row: Option<Row> = client(&server.uri())
            .from("users")
            .update(&serde_json::json!({"first_name": "Ada"}))
            .unwrap()
            .eq("id", "u-1")
            .returning()
            .fetch_single()
            .await
            .unwrap();
        assert_eq!(row.map(|r| r.id), Some("u-1".to_string()));
    }

    #[tokio::test]
    async fn test_rpc_posts_args_without_prefer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_unique_currency_pairs"))
            .and(body_json(serde_json::json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "USD/EUR", "weight": 1.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Row> = client(&server.uri())
            .rpc("get_unique_currency_pairs", &serde_json::json!({}))
            .unwrap()
            .fetch()
            .await
            .unwrap();
        assert_eq!(rows[0].id, "USD/EUR");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("Prefer").is_none());
        assert!(requests[0].url.query().is_none());
    }

    #[tokio::test]
    async fn test_in_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/calendar_events_with_tickers"))
            .and(query_param("ticker_id", "in.(t-1,t-2)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Row> = client(&server.uri())
            .from("calendar_events_with_tickers")
            .in_("ticker_id", &["t-1", "t-2"])
            .fetch()
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_signed_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/sign/receipts/2024/r1.jpg"))
            .and(body_json(serde_json::json!({"expiresIn": 3600})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "signedURL": "/object/sign/receipts/2024/r1.jpg?token=abc"
            })))
            .mount(&server)
            .await;

        let url = client(&server.uri())
            .signed_url("receipts", "2024/r1.jpg", 3600)
            .await
            .unwrap();
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/sign/receipts/2024/r1.jpg?token=abc",
                server.uri()
            )
        );
    }
}
