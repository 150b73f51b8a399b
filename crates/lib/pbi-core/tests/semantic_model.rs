use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pbi_core::api::{Dataset, PbiApi, QueryResult, Row, Workspace};
use pbi_core::client::{PbiClient, WorkspaceCache};
use pbi_core::dax;
use pbi_core::error::PbiError;
use serde_json::{Value, json};

/// In-memory service double: canned workspaces, datasets, and per-query
/// results, with a counter on workspace listings.
#[derive(Default)]
struct FakeApi {
    workspaces: Vec<Workspace>,
    datasets: HashMap<String, Vec<Dataset>>,
    responses: HashMap<String, QueryResult>,
    failures: HashMap<String, String>,
    workspace_listings: AtomicUsize,
}

impl FakeApi {
    fn with_workspace(mut self, id: &str, name: &str) -> Self {
        self.workspaces.push(Workspace {
            id: id.to_string(),
            name: name.to_string(),
            is_premium: false,
        });
        self
    }

    fn with_dataset(mut self, workspace_id: &str, dataset_id: &str, name: &str) -> Self {
        self.datasets
            .entry(workspace_id.to_string())
            .or_default()
            .push(Dataset {
                id: dataset_id.to_string(),
                name: name.to_string(),
            });
        self
    }

    fn with_response(mut self, query: &str, rows: Vec<Value>) -> Self {
        self.responses
            .insert(query.to_string(), parse_rows(rows));
        self
    }

    fn with_failure(mut self, query: &str, message: &str) -> Self {
        self.failures
            .insert(query.to_string(), message.to_string());
        self
    }
}

#[async_trait]
impl PbiApi for FakeApi {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, PbiError> {
        self.workspace_listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.workspaces.clone())
    }

    async fn list_datasets(&self, workspace_id: &str) -> Result<Vec<Dataset>, PbiError> {
        Ok(self.datasets.get(workspace_id).cloned().unwrap_or_default())
    }

    async fn execute_queries(
        &self,
        _workspace_id: &str,
        _dataset_id: &str,
        query: &str,
    ) -> Result<QueryResult, PbiError> {
        if let Some(message) = self.failures.get(query) {
            return Err(PbiError::QueryExecution(message.clone()));
        }
        Ok(self.responses.get(query).cloned().unwrap_or_default())
    }
}

fn parse_rows(rows: Vec<Value>) -> QueryResult {
    rows.into_iter()
        .map(|row| serde_json::from_value::<Row>(row).expect("row should deserialize"))
        .collect()
}

fn stat_row(table: &str, column: &str, min: Value, max: Value, cardinality: u64) -> Value {
    json!({
        "[Table Name]": table,
        "[Column Name]": column,
        "[Min]": min,
        "[Max]": max,
        "[Cardinality]": cardinality
    })
}

fn sales_model_stats() -> Vec<Value> {
    vec![
        stat_row("Sales", "RowNumber-2662979B", Value::Null, Value::Null, 0),
        stat_row("Sales", "CustomerID", json!(1), json!(500), 500),
        stat_row("Sales", "Amount", json!(0.5), json!(912.0), 4821),
        stat_row("Sales", "Order Date", json!("2023-01-02"), json!("2024-12-30"), 720),
        stat_row("Sales", "Status", json!("Lost"), json!("Won"), 3),
        stat_row("LocalDateTable_f00", "Date", json!("2023-01-01"), json!("2024-12-31"), 730),
        stat_row("Customers", "CustomerID", json!(1), json!(500), 500),
        stat_row("Customers", "Name", json!("Alice"), json!("Zoe"), 498),
    ]
}

fn sales_client() -> PbiClient<FakeApi> {
    let api = FakeApi::default()
        .with_workspace("w1", "Analytics")
        .with_dataset("w1", "d1", "Sales Model")
        .with_response(dax::COLUMN_STATISTICS, sales_model_stats());
    PbiClient::new(api)
}

#[tokio::test]
async fn describe_dataset_builds_filtered_schema() {
    let client = sales_client();
    let description = client
        .describe_dataset("Analytics", "Sales Model")
        .await
        .expect("schema");

    assert_eq!(description.dataset_name, "Sales Model");
    assert_eq!(description.dataset_id, "d1");

    let table_names: Vec<&str> = description
        .tables
        .iter()
        .map(|table| table.name.as_str())
        .collect();
    assert_eq!(table_names, ["Sales", "Customers"]);

    let sales = &description.tables[0];
    let column_names: Vec<&str> = sales
        .columns
        .iter()
        .map(|column| column.name.as_str())
        .collect();
    assert_eq!(column_names, ["CustomerID", "Amount", "Order Date", "Status"]);

    assert_eq!(description.relationships.len(), 1);
    assert_eq!(description.relationships[0].key_column, "CustomerID");
    assert_eq!(description.relationships[0].tables, ["Sales", "Customers"]);

    assert!(description.llm_context.contains("This model contains 2 tables"));
    assert!(description.llm_context.contains("### 'Sales'"));
    assert!(
        description
            .llm_context
            .contains("| Order Date | DateTime | 720 | 2023-01-02 to 2024-12-30 |")
    );
    assert!(
        description
            .llm_context
            .contains("- **CustomerID**: links Sales <-> Customers")
    );
}

#[tokio::test]
async fn describe_dataset_is_deterministic() {
    let client = sales_client();
    let first = client
        .describe_dataset("Analytics", "Sales Model")
        .await
        .expect("schema");
    let second = client
        .describe_dataset("Analytics", "Sales Model")
        .await
        .expect("schema");
    assert_eq!(first.llm_context, second.llm_context);
}

#[tokio::test]
async fn describe_dataset_with_only_synthetic_rows_is_empty() {
    let api = FakeApi::default()
        .with_workspace("w1", "Analytics")
        .with_dataset("w1", "d1", "Dates Only")
        .with_response(
            dax::COLUMN_STATISTICS,
            vec![stat_row(
                "DateTableTemplate_9f2",
                "Date",
                json!("2020-01-01"),
                json!("2030-12-31"),
                4018,
            )],
        );
    let client = PbiClient::new(api);

    let description = client
        .describe_dataset("Analytics", "Dates Only")
        .await
        .expect("schema");
    assert!(description.tables.is_empty());
    assert!(description.relationships.is_empty());
    assert!(description.llm_context.contains("This model contains 0 tables"));
    assert!(!description.llm_context.contains("## Inferred Relationships"));
}

#[tokio::test]
async fn unknown_workspace_is_a_resolution_miss() {
    let client = sales_client();
    let err = client.workspace_id("Nope").await.expect_err("miss");
    assert!(matches!(err, PbiError::WorkspaceNotFound(name) if name == "Nope"));
}

#[tokio::test]
async fn unknown_dataset_names_the_dataset() {
    let client = sales_client();
    let err = client
        .dataset_id("Analytics", "Missing Model")
        .await
        .expect_err("miss");
    match err {
        PbiError::DatasetNotFound { workspace, dataset } => {
            assert_eq!(workspace, "Analytics");
            assert_eq!(dataset, "Missing Model");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn workspace_listing_happens_once_per_process() {
    let api = Arc::new(
        FakeApi::default()
            .with_workspace("w1", "Analytics")
            .with_dataset("w1", "d1", "Sales Model"),
    );
    let client = PbiClient::from_arc(api.clone());

    let _ = client.workspace_id("Analytics").await.expect("id");
    let _ = client.workspace_id("Analytics").await.expect("id");
    let _ = client.is_premium("Analytics").await.expect("flag");
    // A miss after population does not trigger a refresh either.
    let _ = client.workspace_id("Nope").await.expect_err("miss");

    assert_eq!(api.workspace_listings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn preloaded_cache_skips_the_service() {
    let api = Arc::new(FakeApi::default());
    let cache = WorkspaceCache::preloaded(vec![Workspace {
        id: "w9".to_string(),
        name: "Warm".to_string(),
        is_premium: true,
    }]);
    let client = PbiClient::with_cache(api.clone(), cache);

    let id = client.workspace_id("Warm").await.expect("id");
    assert_eq!(id, "w9");
    assert!(client.is_premium("Warm").await.expect("flag"));
    assert_eq!(api.workspace_listings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_workspace_names_keep_first_listed() {
    let api = FakeApi::default()
        .with_workspace("w1", "Shared")
        .with_workspace("w2", "Shared");
    let client = PbiClient::new(api);

    let id = client.workspace_id("Shared").await.expect("id");
    assert_eq!(id, "w1");
}

#[tokio::test]
async fn query_failure_carries_service_message_verbatim() {
    let api = FakeApi::default()
        .with_workspace("w1", "Analytics")
        .with_dataset("w1", "d1", "Sales Model")
        .with_failure(
            "EVALUATE 'Missing'",
            "Query (1, 10) The table 'Missing' could not be found.",
        );
    let client = PbiClient::new(api);

    let err = client
        .execute_dax("Analytics", "Sales Model", "EVALUATE 'Missing'")
        .await
        .expect_err("failure");
    assert!(matches!(
        err,
        PbiError::QueryExecution(message)
            if message == "Query (1, 10) The table 'Missing' could not be found."
    ));
}

#[tokio::test]
async fn read_table_issues_a_bounded_scan() {
    let api = FakeApi::default()
        .with_workspace("w1", "Analytics")
        .with_dataset("w1", "d1", "Sales Model")
        .with_response(
            "EVALUATE TOPN(2, 'Sales')",
            vec![json!({"[Amount]": 1.0}), json!({"[Amount]": 2.0})],
        );
    let client = PbiClient::new(api);

    let rows = client
        .read_table("Analytics", "Sales Model", "Sales", Some(2))
        .await
        .expect("rows");
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn search_unions_nonempty_hits_and_skips_failed_probes() {
    let name_probe = dax::contains_search("Customers", "Name", "Ali", 100);
    let api = FakeApi::default()
        .with_workspace("w1", "Analytics")
        .with_dataset("w1", "d1", "Sales Model")
        .with_response(dax::COLUMN_STATISTICS, sales_model_stats())
        .with_response(&name_probe, vec![json!({"[Name]": "Alice"})])
        .with_failure(
            &dax::contains_search("Sales", "Status", "Ali", 100),
            "Column 'Status' cannot be scanned",
        );
    let client = PbiClient::new(api);

    let hits = client
        .search_across_tables("Analytics", "Sales Model", "Ali", 100)
        .await
        .expect("hits");

    // Only the two Text columns are probed: Sales.Status fails and is
    // skipped, Customers.Name matches. Number and DateTime columns are
    // never queried.
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].table, "Customers");
    assert_eq!(hits[0].column, "Name");
    assert_eq!(hits[0].rows.len(), 1);
}

#[tokio::test]
async fn empty_query_result_is_not_an_error() {
    let client = sales_client();
    let rows = client
        .execute_dax("Analytics", "Sales Model", "EVALUATE 'Empty'")
        .await
        .expect("rows");
    assert!(rows.is_empty());
}
