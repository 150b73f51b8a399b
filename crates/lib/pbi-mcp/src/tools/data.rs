use pbi_core::api::PbiApi;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::PbiMcp;
use crate::helpers;

const DEFAULT_READ_LIMIT: usize = 100;
const DEFAULT_SAMPLE_ROWS: usize = 10;
const DEFAULT_SEARCH_ROWS_PER_TABLE: usize = 100;

/// Parameters for executing a raw DAX query.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteDaxParams {
    pub workspace_name: String,
    pub dataset_name: String,
    pub dax_query: String,
}

/// Parameters for reading a table bounded by TOPN.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ReadTableParams {
    pub workspace_name: String,
    pub dataset_name: String,
    pub table_name: String,
    pub top_n: Option<usize>,
}

/// Parameters for evaluating a measure.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EvaluateMeasureParams {
    pub workspace_name: String,
    pub dataset_name: String,
    pub measure: String,
    /// Fully qualified column references like `'Date'[Year]`.
    #[serde(default)]
    pub group_by: Vec<String>,
}

/// Parameters for sampling rows from the default (or given) model.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SampleTableParams {
    pub table_name: String,
    pub rows: Option<usize>,
    pub workspace_name: Option<String>,
    pub dataset_name: Option<String>,
}

/// Parameters for searching every text column of every table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchAcrossTablesParams {
    pub search_term: String,
    pub max_rows_per_table: Option<usize>,
    pub workspace_name: Option<String>,
    pub dataset_name: Option<String>,
}

#[tool_router(router = tool_router_data, vis = "pub")]
impl<A: PbiApi + 'static> PbiMcp<A> {
    #[tool(
        description = "Execute a DAX query against a semantic model (must start with EVALUATE)."
    )]
    async fn execute_dax(
        &self,
        Parameters(params): Parameters<ExecuteDaxParams>,
    ) -> Result<CallToolResult, ErrorData> {
        info!(
            workspace = %params.workspace_name,
            dataset = %params.dataset_name,
            "tool: execute_dax"
        );
        match self
            .client()
            .execute_dax(&params.workspace_name, &params.dataset_name, &params.dax_query)
            .await
        {
            Ok(rows) => Ok(CallToolResult::success(vec![Content::json(rows)?])),
            Err(err) => Ok(helpers::tool_failure("executing DAX", &err)),
        }
    }

    #[tool(description = "Read data from a table in a semantic model, limited to top_n rows.")]
    async fn read_table(
        &self,
        Parameters(params): Parameters<ReadTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let top_n = params.top_n.unwrap_or(DEFAULT_READ_LIMIT);
        info!(
            workspace = %params.workspace_name,
            dataset = %params.dataset_name,
            table = %params.table_name,
            top_n,
            "tool: read_table"
        );
        match self
            .client()
            .read_table(
                &params.workspace_name,
                &params.dataset_name,
                &params.table_name,
                Some(top_n),
            )
            .await
        {
            Ok(rows) => Ok(CallToolResult::success(vec![Content::json(rows)?])),
            Err(err) => Ok(helpers::tool_failure("reading table", &err)),
        }
    }

    #[tool(description = "Evaluate a measure, optionally grouped by columns.")]
    async fn evaluate_measure(
        &self,
        Parameters(params): Parameters<EvaluateMeasureParams>,
    ) -> Result<CallToolResult, ErrorData> {
        info!(
            workspace = %params.workspace_name,
            dataset = %params.dataset_name,
            measure = %params.measure,
            "tool: evaluate_measure"
        );
        match self
            .client()
            .evaluate_measure(
                &params.workspace_name,
                &params.dataset_name,
                &params.measure,
                &params.group_by,
            )
            .await
        {
            Ok(rows) => Ok(CallToolResult::success(vec![Content::json(rows)?])),
            Err(err) => Ok(helpers::tool_failure("evaluating measure", &err)),
        }
    }

    #[tool(
        description = "Sample rows from a table of the default semantic model (or an explicit \
                       workspace/dataset pair)."
    )]
    async fn sample_table(
        &self,
        Parameters(params): Parameters<SampleTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (workspace, dataset) = match self.scope(params.workspace_name, params.dataset_name) {
            Ok(scope) => scope,
            Err(message) => return Ok(helpers::invalid_input(message)),
        };
        let rows = params.rows.unwrap_or(DEFAULT_SAMPLE_ROWS);
        info!(%workspace, %dataset, table = %params.table_name, rows, "tool: sample_table");
        match self
            .client()
            .read_table(&workspace, &dataset, &params.table_name, Some(rows))
            .await
        {
            Ok(rows) => Ok(CallToolResult::success(vec![Content::json(rows)?])),
            Err(err) => Ok(helpers::tool_failure("sampling table", &err)),
        }
    }

    #[tool(
        description = "Search for a value across every text column of every table in the default \
                       semantic model (or an explicit workspace/dataset pair). Returns one hit \
                       entry per matching table/column."
    )]
    async fn search_across_tables(
        &self,
        Parameters(params): Parameters<SearchAcrossTablesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (workspace, dataset) = match self.scope(params.workspace_name, params.dataset_name) {
            Ok(scope) => scope,
            Err(message) => return Ok(helpers::invalid_input(message)),
        };
        let max_rows = params
            .max_rows_per_table
            .unwrap_or(DEFAULT_SEARCH_ROWS_PER_TABLE);
        info!(%workspace, %dataset, term = %params.search_term, "tool: search_across_tables");
        match self
            .client()
            .search_across_tables(&workspace, &dataset, &params.search_term, max_rows)
            .await
        {
            Ok(hits) => Ok(CallToolResult::success(vec![Content::json(hits)?])),
            Err(err) => Ok(helpers::tool_failure("searching tables", &err)),
        }
    }
}
