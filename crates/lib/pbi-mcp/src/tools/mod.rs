//! MCP tool modules.
//!
//! Tools are grouped by domain: workspace/dataset metadata, schema
//! inference, and DAX data access.

pub mod data;
pub mod metadata;
pub mod schema;
