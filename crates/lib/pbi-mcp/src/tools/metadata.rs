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

/// Parameters for listing the datasets of a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListDatasetsParams {
    pub workspace_name: String,
}

#[tool_router(router = tool_router_metadata, vis = "pub")]
impl<A: PbiApi + 'static> PbiMcp<A> {
    #[tool(description = "List all Power BI workspaces accessible to the authenticated user.")]
    async fn list_workspaces(&self) -> Result<CallToolResult, ErrorData> {
        info!("tool: list_workspaces");
        match self.client().list_workspaces().await {
            Ok(workspaces) => Ok(CallToolResult::success(vec![Content::json(workspaces)?])),
            Err(err) => Ok(helpers::tool_failure("listing workspaces", &err)),
        }
    }

    #[tool(description = "List all semantic models (datasets) in a workspace.")]
    async fn list_datasets(
        &self,
        Parameters(params): Parameters<ListDatasetsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        info!(workspace = %params.workspace_name, "tool: list_datasets");
        match self.client().list_datasets(&params.workspace_name).await {
            Ok(datasets) => Ok(CallToolResult::success(vec![Content::json(datasets)?])),
            Err(err) => Ok(helpers::tool_failure("listing datasets", &err)),
        }
    }
}
