use pbi_core::error::PbiError;
use rmcp::model::{CallToolResult, Content};
use tracing::warn;

/// Converts an inner-layer failure into a caller-facing error result.
///
/// This is the sole error boundary: tool callers receive a result value
/// describing the failure, never a protocol fault.
pub(crate) fn tool_failure(context: &str, err: &PbiError) -> CallToolResult {
    warn!(context, error = %err, "tool call failed");
    CallToolResult::error(vec![Content::text(format!("Error {context}: {err}"))])
}

/// Error result for invalid tool input, without an inner error.
pub(crate) fn invalid_input(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}
