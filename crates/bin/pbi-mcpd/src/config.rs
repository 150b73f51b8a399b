use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use pbi_core::api::DEFAULT_BASE_URL;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_SSE_KEEP_ALIVE_SECS: u64 = 15;
const DEFAULT_SSE_RETRY_SECS: u64 = 3;

#[derive(Parser, Debug)]
#[command(name = "pbi-mcpd", version, about = "Power BI MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "PBI_API_BASE", default_value = DEFAULT_BASE_URL)]
    api_base: String,

    /// Bearer token for the Power BI REST API. When absent, tokens come
    /// from the Azure CLI (`az login`).
    #[arg(long, env = "PBI_ACCESS_TOKEN")]
    access_token: Option<String>,

    #[arg(long, env = "PBI_DEFAULT_WORKSPACE")]
    default_workspace: Option<String>,

    #[arg(long, env = "PBI_DEFAULT_DATASET")]
    default_dataset: Option<String>,

    #[arg(
        long = "stdio",
        env = "PBI_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(long, env = "PBI_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(
        long,
        env = "PBI_MCP_STATEFUL",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    stateful_mode: bool,

    /// 0 disables SSE keep-alive pings.
    #[arg(
        long,
        env = "PBI_SSE_KEEP_ALIVE_SECS",
        default_value_t = DEFAULT_SSE_KEEP_ALIVE_SECS
    )]
    sse_keep_alive_secs: u64,

    /// 0 disables the SSE retry hint.
    #[arg(long, env = "PBI_SSE_RETRY_SECS", default_value_t = DEFAULT_SSE_RETRY_SECS)]
    sse_retry_secs: u64,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone, Debug)]
pub struct PbiConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    pub default_workspace: Option<String>,
    pub default_dataset: Option<String>,
    pub enable_stdio: bool,
    pub mcp_http_addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl PbiConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for PbiConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let access_token = args.access_token.filter(|value| !value.trim().is_empty());
        let default_workspace = args
            .default_workspace
            .filter(|value| !value.trim().is_empty());
        let default_dataset = args
            .default_dataset
            .filter(|value| !value.trim().is_empty());

        // The default semantic model is all-or-nothing.
        if default_dataset.is_some() && default_workspace.is_none() {
            return Err(ConfigError::MissingSetting("PBI_DEFAULT_WORKSPACE"));
        }
        if default_workspace.is_some() && default_dataset.is_none() {
            return Err(ConfigError::MissingSetting("PBI_DEFAULT_DATASET"));
        }

        if args.api_base.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "PBI_API_BASE",
                value: args.api_base,
            });
        }

        let sse_keep_alive = if args.sse_keep_alive_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.sse_keep_alive_secs))
        };
        let sse_retry = if args.sse_retry_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.sse_retry_secs))
        };

        Ok(Self {
            api_base: args.api_base.trim_end_matches('/').to_string(),
            access_token,
            default_workspace,
            default_dataset,
            enable_stdio: args.enable_stdio,
            mcp_http_addr: args.mcp_http_addr,
            stateful_mode: args.stateful_mode,
            sse_keep_alive,
            sse_retry,
        })
    }
}
