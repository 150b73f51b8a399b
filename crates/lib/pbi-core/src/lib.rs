//! Core types and services for pbi-mcp.
//!
//! This crate owns the Power BI REST client, name-to-id resolution with its
//! process-lifetime workspace cache, DAX query execution, and the schema
//! inference engine that turns `COLUMNSTATISTICS()` output into an
//! LLM-readable model description.

pub mod api;
pub mod auth;
pub mod client;
pub mod dax;
pub mod error;
pub mod schema;

pub use api::{Dataset, PbiApi, QueryResult, RestApi, Row, Workspace};
pub use client::{PbiClient, SearchHit, WorkspaceCache};
pub use error::PbiError;
pub use schema::SchemaDescription;
