//! DAX query text assembly.
//!
//! Pure string builders, kept separate from the network layer so the exact
//! query shapes stay unit-testable. No parsing or validation happens here;
//! the service reports malformed queries through its own error payloads.

use std::fmt::Write;

/// Fixed statistics query: one row per (table, column) with min, max, and
/// cardinality. The whole schema inference engine feeds on its output.
pub const COLUMN_STATISTICS: &str = "EVALUATE COLUMNSTATISTICS()";

/// Quotes a table name, doubling embedded single quotes.
#[must_use]
pub fn table_ref(table: &str) -> String {
    format!("'{}'", table.replace('\'', "''"))
}

/// Quotes a `'Table'[Column]` reference.
#[must_use]
pub fn column_ref(table: &str, column: &str) -> String {
    format!("{}[{column}]", table_ref(table))
}

/// Escapes a string literal for embedding between double quotes.
#[must_use]
pub fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Reads a table, optionally bounded by `TOPN`.
#[must_use]
pub fn read_table(table: &str, top_n: Option<usize>) -> String {
    top_n.map_or_else(
        || format!("EVALUATE {}", table_ref(table)),
        |limit| format!("EVALUATE TOPN({limit}, {})", table_ref(table)),
    )
}

/// Bounded substring search over one text column.
#[must_use]
pub fn contains_search(table: &str, column: &str, term: &str, max_rows: usize) -> String {
    format!(
        "EVALUATE TOPN({max_rows}, FILTER({}, CONTAINSSTRING({}, {})))",
        table_ref(table),
        column_ref(table, column),
        string_literal(term),
    )
}

/// Evaluates a measure, optionally grouped by columns.
#[must_use]
pub fn evaluate_measure(measure: &str, group_by: &[String]) -> String {
    if group_by.is_empty() {
        return format!("EVALUATE ROW(\"Result\", {measure})");
    }
    let mut query = String::from("EVALUATE SUMMARIZECOLUMNS(");
    for column in group_by {
        let _ = write!(query, "{column}, ");
    }
    let _ = write!(query, "\"Result\", {measure})");
    query
}
