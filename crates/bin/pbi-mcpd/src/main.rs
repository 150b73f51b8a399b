//! Daemon entry point for the Power BI MCP server.
//!
//! Loads configuration from the environment, selects a token provider,
//! builds the semantic-model client, and serves the MCP protocol over
//! stdio or streamable HTTP.

mod config;

use std::sync::Arc;

use pbi_core::api::RestApi;
use pbi_core::auth::{AzureCliTokenProvider, StaticTokenProvider, TokenProvider};
use pbi_core::client::PbiClient;
use pbi_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use pbi_mcp::{DefaultModel, PbiMcp};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::PbiConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = PbiConfig::from_args()?;

    // Stdout belongs to the stdio transport; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let tokens: Arc<dyn TokenProvider> = match config.access_token.clone() {
        Some(token) => {
            info!("authenticating with a static access token");
            Arc::new(StaticTokenProvider::new(token))
        }
        None => {
            info!("authenticating through the azure cli (az login)");
            Arc::new(AzureCliTokenProvider::new())
        }
    };

    let api = RestApi::with_base_url(tokens, config.api_base.clone())?;
    let mut service = PbiMcp::new(PbiClient::new(api));
    if let (Some(workspace), Some(dataset)) = (
        config.default_workspace.clone(),
        config.default_dataset.clone(),
    ) {
        info!(%workspace, %dataset, "default semantic model configured");
        service = service.with_default_model(DefaultModel { workspace, dataset });
    }

    if config.enable_stdio {
        info!("serving MCP over stdio");
        serve_stdio(service).await?;
    } else {
        let http_config = McpHttpServerConfig::new(config.mcp_http_addr)
            .with_stateful_mode(config.stateful_mode)
            .with_sse_keep_alive(config.sse_keep_alive)
            .with_sse_retry(config.sse_retry);
        info!(addr = %http_config.addr, "serving MCP over streamable HTTP");
        serve_streamable_http(service, http_config).await?;
    }
    Ok(())
}
