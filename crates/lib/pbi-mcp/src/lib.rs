//! MCP server implementation for pbi-mcp.
//!
//! This crate wires the semantic-model client into rmcp tool handlers and
//! exposes the MCP-facing API surface for discovery, schema inference, and
//! DAX execution.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use pbi_core::api::PbiApi;
use pbi_core::client::PbiClient;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};

const SERVER_INSTRUCTIONS: &str = r#"pbi-mcp provides MCP tools for querying Power BI semantic models with DAX.

Workflow:
1. Call `list_workspaces` to discover workspaces, then `list_datasets` for the
   semantic models inside one.
2. Call `describe_dataset` first to understand a model before writing DAX. It
   returns every table and column with inferred types, cardinality, value
   ranges, inferred relationships, and an `llm_context` report to ground query
   generation.
3. Query data:
   - `execute_dax` runs any query starting with EVALUATE.
   - `read_table` reads a table bounded by TOPN.
   - `evaluate_measure` evaluates a measure, optionally grouped by columns.
   - `sample_table` and `search_across_tables` use the configured default
     semantic model unless a workspace/dataset override is given.

Notes:
- Reference tables with single quotes ('Sales') and columns as 'Sales'[Amount],
  e.g. EVALUATE TOPN(10, 'Sales') or
  EVALUATE SUMMARIZECOLUMNS('Date'[Year], "Total", SUM('Sales'[Amount])).
- Inferred types and relationships are heuristics from column statistics, not
  declared model metadata.
- Tool failures come back as descriptive error text, never protocol faults.
- `health` returns `ok`."#;

/// Default semantic model for tools that accept an implicit scope.
#[derive(Debug, Clone)]
pub struct DefaultModel {
    pub workspace: String,
    pub dataset: String,
}

/// MCP server wrapper around the semantic-model client and tool routers.
pub struct PbiMcp<A: PbiApi> {
    tool_router: ToolRouter<Self>,
    client: Arc<PbiClient<A>>,
    default_model: Option<DefaultModel>,
}

impl<A: PbiApi> Clone for PbiMcp<A> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            client: self.client.clone(),
            default_model: self.default_model.clone(),
        }
    }
}

impl<A: PbiApi + 'static> PbiMcp<A> {
    /// Creates a new server using a client by value.
    #[must_use]
    pub fn new(client: PbiClient<A>) -> Self {
        Self::with_client(Arc::new(client))
    }

    /// Creates a new server using a shared client handle.
    #[must_use]
    pub fn with_client(client: Arc<PbiClient<A>>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_metadata()
            + Self::tool_router_schema()
            + Self::tool_router_data();
        Self {
            tool_router,
            client,
            default_model: None,
        }
    }

    /// Sets the default semantic model used by scope-optional tools.
    #[must_use]
    pub fn with_default_model(mut self, model: DefaultModel) -> Self {
        self.default_model = Some(model);
        self
    }

    pub(crate) fn client(&self) -> &PbiClient<A> {
        &self.client
    }

    /// Resolves the (workspace, dataset) scope for tools where both params
    /// are optional, falling back to the configured default model.
    pub(crate) fn scope(
        &self,
        workspace: Option<String>,
        dataset: Option<String>,
    ) -> Result<(String, String), String> {
        match (workspace, dataset, self.default_model.as_ref()) {
            (Some(workspace), Some(dataset), _) => Ok((workspace, dataset)),
            (None, None, Some(model)) => Ok((model.workspace.clone(), model.dataset.clone())),
            (Some(_), None, _) | (None, Some(_), _) => Err(
                "workspace_name and dataset_name must be given together".to_string(),
            ),
            (None, None, None) => Err(
                "no default semantic model is configured; pass workspace_name and dataset_name"
                    .to_string(),
            ),
        }
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<A: PbiApi + 'static> PbiMcp<A> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl<A: PbiApi + 'static> ServerHandler for PbiMcp<A> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbi_core::api::{Dataset, QueryResult, Workspace};
    use pbi_core::error::PbiError;

    struct NoopApi;

    #[async_trait::async_trait]
    impl PbiApi for NoopApi {
        async fn list_workspaces(&self) -> Result<Vec<Workspace>, PbiError> {
            Ok(Vec::new())
        }

        async fn list_datasets(&self, _workspace_id: &str) -> Result<Vec<Dataset>, PbiError> {
            Ok(Vec::new())
        }

        async fn execute_queries(
            &self,
            _workspace_id: &str,
            _dataset_id: &str,
            _query: &str,
        ) -> Result<QueryResult, PbiError> {
            Ok(Vec::new())
        }
    }

    fn server(default_model: Option<DefaultModel>) -> PbiMcp<NoopApi> {
        let server = PbiMcp::new(PbiClient::new(NoopApi));
        match default_model {
            Some(model) => server.with_default_model(model),
            None => server,
        }
    }

    #[test]
    fn scope_prefers_explicit_params() {
        let server = server(Some(DefaultModel {
            workspace: "W".to_string(),
            dataset: "D".to_string(),
        }));
        let scope = server
            .scope(Some("Other".to_string()), Some("Model".to_string()))
            .expect("scope");
        assert_eq!(scope, ("Other".to_string(), "Model".to_string()));
    }

    #[test]
    fn scope_falls_back_to_default_model() {
        let server = server(Some(DefaultModel {
            workspace: "W".to_string(),
            dataset: "D".to_string(),
        }));
        let scope = server.scope(None, None).expect("scope");
        assert_eq!(scope, ("W".to_string(), "D".to_string()));
    }

    #[test]
    fn scope_without_default_is_a_descriptive_error() {
        let server = server(None);
        let err = server.scope(None, None).expect_err("no scope");
        assert!(err.contains("no default semantic model"));
    }

    #[test]
    fn half_specified_scope_is_rejected() {
        let server = server(None);
        let err = server
            .scope(Some("W".to_string()), None)
            .expect_err("half scope");
        assert!(err.contains("together"));
    }
}
