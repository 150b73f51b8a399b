//! Power BI REST API access.
//!
//! [`PbiApi`] is the seam between everything above it and the wire: the
//! resolver, executor, and schema engine are all exercised in tests through
//! an in-memory implementation of this trait. [`RestApi`] is the production
//! implementation over reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::PbiError;

/// Default service root, overridable for sovereign clouds or test stubs.
pub const DEFAULT_BASE_URL: &str = "https://api.powerbi.com/v1.0/myorg";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A single result row: column label to scalar value, in service order.
pub type Row = serde_json::Map<String, Value>;

/// Flattened query output. An empty sequence is a valid result, distinct
/// from an error.
pub type QueryResult = Vec<Row>;

/// A workspace as listed by `GET /groups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default, rename(deserialize = "isOnDedicatedCapacity"))]
    pub is_premium: bool,
}

/// A semantic model as listed by `GET /groups/{id}/datasets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Serialize)]
struct ExecuteQueriesRequest<'a> {
    queries: [QueryText<'a>; 1],
    #[serde(rename = "serializerSettings")]
    serializer_settings: SerializerSettings,
}

#[derive(Serialize)]
struct QueryText<'a> {
    query: &'a str,
}

#[derive(Serialize)]
struct SerializerSettings {
    #[serde(rename = "includeNulls")]
    include_nulls: bool,
}

#[derive(Debug, Deserialize)]
struct ExecuteQueriesResponse {
    #[serde(default)]
    results: Vec<QueryOutcome>,
}

#[derive(Debug, Deserialize)]
struct QueryOutcome {
    #[serde(default)]
    tables: Vec<ResultTable>,
}

#[derive(Debug, Deserialize)]
struct ResultTable {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    message: Option<String>,
}

/// Raw REST operations against the Power BI service.
#[async_trait]
pub trait PbiApi: Send + Sync {
    /// Lists every workspace the caller can access.
    ///
    /// # Errors
    /// Returns [`PbiError`] on transport or auth failure.
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, PbiError>;

    /// Lists the datasets of one workspace by workspace id.
    ///
    /// # Errors
    /// Returns [`PbiError`] on transport or auth failure.
    async fn list_datasets(&self, workspace_id: &str) -> Result<Vec<Dataset>, PbiError>;

    /// Executes one DAX query and returns the first result table's rows.
    ///
    /// # Errors
    /// Returns [`PbiError::QueryExecution`] when the service rejects the
    /// query, carrying the service message verbatim.
    async fn execute_queries(
        &self,
        workspace_id: &str,
        dataset_id: &str,
        query: &str,
    ) -> Result<QueryResult, PbiError>;
}

/// Reqwest-backed [`PbiApi`] implementation.
pub struct RestApi {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl RestApi {
    /// Builds a client against the public service root.
    ///
    /// # Errors
    /// Returns [`PbiError::Transport`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, PbiError> {
        Self::with_base_url(tokens, DEFAULT_BASE_URL)
    }

    /// Builds a client against a custom service root.
    ///
    /// # Errors
    /// Returns [`PbiError::Transport`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn with_base_url(
        tokens: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
    ) -> Result<Self, PbiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            tokens,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, PbiError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PbiApi for RestApi {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, PbiError> {
        let listed: ListResponse<Workspace> = self.get_json("/groups").await?;
        debug!(count = listed.value.len(), "listed workspaces");
        Ok(listed.value)
    }

    async fn list_datasets(&self, workspace_id: &str) -> Result<Vec<Dataset>, PbiError> {
        let listed: ListResponse<Dataset> = self
            .get_json(&format!("/groups/{workspace_id}/datasets"))
            .await?;
        debug!(
            workspace_id,
            count = listed.value.len(),
            "listed datasets"
        );
        Ok(listed.value)
    }

    async fn execute_queries(
        &self,
        workspace_id: &str,
        dataset_id: &str,
        query: &str,
    ) -> Result<QueryResult, PbiError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/groups/{workspace_id}/datasets/{dataset_id}/executeQueries",
            self.base_url
        );
        let body = ExecuteQueriesRequest {
            queries: [QueryText { query }],
            serializer_settings: SerializerSettings {
                include_nulls: true,
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await?;
            return Err(PbiError::QueryExecution(service_error_message(body)));
        }

        let response: ExecuteQueriesResponse = response.json().await?;
        Ok(flatten_results(response))
    }
}

/// Extracts the structured `error.message` from a failure payload, falling
/// back to the raw body text.
fn service_error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .unwrap_or(body)
}

/// Takes the first query's first result table. No tables is an empty
/// result, not an error.
fn flatten_results(response: ExecuteQueriesResponse) -> QueryResult {
    response
        .results
        .into_iter()
        .next()
        .and_then(|outcome| outcome.tables.into_iter().next())
        .map(|table| table.rows)
        .unwrap_or_default()
}
