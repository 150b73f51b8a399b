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

/// Parameters for inferring a semantic model's schema.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DescribeDatasetParams {
    pub workspace_name: String,
    pub dataset_name: String,
}

#[tool_router(router = tool_router_schema, vis = "pub")]
impl<A: PbiApi + 'static> PbiMcp<A> {
    #[tool(
        description = "Get complete schema information about a semantic model: tables, columns \
                       with inferred types, cardinality, value ranges, inferred relationships, \
                       and an LLM-friendly context report. Use this first, before writing DAX."
    )]
    async fn describe_dataset(
        &self,
        Parameters(params): Parameters<DescribeDatasetParams>,
    ) -> Result<CallToolResult, ErrorData> {
        info!(
            workspace = %params.workspace_name,
            dataset = %params.dataset_name,
            "tool: describe_dataset"
        );
        match self
            .client()
            .describe_dataset(&params.workspace_name, &params.dataset_name)
            .await
        {
            Ok(description) => Ok(CallToolResult::success(vec![Content::json(description)?])),
            Err(err) => Ok(helpers::tool_failure("describing dataset", &err)),
        }
    }
}
