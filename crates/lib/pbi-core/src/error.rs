use thiserror::Error;

/// Errors raised by the resolver, executor, and auth layers.
///
/// The schema inference engine never produces errors of its own; anything it
/// surfaces originates here and propagates unmodified. The MCP tool layer is
/// the sole boundary that converts these into caller-facing text.
#[derive(Debug, Error)]
pub enum PbiError {
    #[error("Workspace '{0}' not found")]
    WorkspaceNotFound(String),

    #[error("Dataset '{dataset}' not found in workspace '{workspace}'")]
    DatasetNotFound { workspace: String, dataset: String },

    /// The service rejected or failed a DAX query. The message is taken
    /// verbatim from the service's structured error payload when present,
    /// otherwise from the raw response body.
    #[error("DAX query failed: {0}")]
    QueryExecution(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
