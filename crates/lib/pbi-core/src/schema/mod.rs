//! Schema inference engine.
//!
//! Turns raw `COLUMNSTATISTICS()` rows into a structured table/column/
//! relationship model plus a deterministic natural-language rendering used
//! to ground an LLM's DAX generation. Everything in this module is a pure
//! in-memory transform: resolution and query failures happen before the
//! rows arrive here, and nothing here fails.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::Row;

pub mod infer;
pub mod render;
pub mod stats;

pub use stats::ColumnStatistic;

/// Column type inferred from the statistics row, never supplied by the
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Number,
    DateTime,
    Text,
    Unknown,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "Number",
            Self::DateTime => "DateTime",
            Self::Text => "Text",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One column of the derived schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    #[serde(rename = "minValue")]
    pub min: Option<Value>,
    #[serde(rename = "maxValue")]
    pub max: Option<Value>,
    pub cardinality: Option<u64>,
}

/// One table of the derived schema, columns in first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// A key-shaped column name recurring across two or more tables. This is a
/// name-coincidence heuristic, not declared foreign-key metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "keyColumn")]
    pub key_column: String,
    pub tables: Vec<String>,
}

/// Complete inferred schema for one semantic model. Built fresh on every
/// invocation; the engine never caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub dataset_name: String,
    pub dataset_id: String,
    pub tables: Vec<TableSchema>,
    pub relationships: Vec<Relationship>,
    /// Rendered grounding context. Same input rows, byte-identical output.
    pub llm_context: String,
}

/// Builds the full schema description from raw statistics rows.
#[must_use]
pub fn build_schema(dataset_name: &str, dataset_id: &str, rows: &[Row]) -> SchemaDescription {
    let statistics = stats::parse_rows(rows);
    let tables = infer::group_tables(statistics);
    let relationships = infer::infer_relationships(&tables);
    let llm_context = render::render(dataset_name, &tables, &relationships);
    SchemaDescription {
        dataset_name: dataset_name.to_string(),
        dataset_id: dataset_id.to_string(),
        tables,
        relationships,
        llm_context,
    }
}
