//! Parsing and filtering of `COLUMNSTATISTICS()` result rows.

use serde_json::Value;

use crate::api::Row;

/// Auto-generated date-hierarchy tables the engine emits for every date
/// column. They add no user-facing value and are dropped unconditionally.
const DATE_TABLE_MARKERS: [&str; 2] = ["DateTableTemplate", "LocalDateTable"];

/// Internal row-numbering columns, likewise dropped.
const ROW_NUMBER_MARKER: &str = "RowNumber-";

/// One raw statistics row: a (table, column) pair with its value range and
/// distinct count.
#[derive(Debug, Clone)]
pub struct ColumnStatistic {
    pub table_name: String,
    pub column_name: String,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub cardinality: Option<u64>,
}

/// True for synthetic date-hierarchy tables.
#[must_use]
pub fn is_synthetic_table(table_name: &str) -> bool {
    DATE_TABLE_MARKERS
        .iter()
        .any(|marker| table_name.contains(marker))
}

/// True for internal row-number columns.
#[must_use]
pub fn is_internal_column(column_name: &str) -> bool {
    column_name.contains(ROW_NUMBER_MARKER)
}

/// The service labels statistics fields either bracketed (`[Min]`) or
/// plain (`Min`) depending on the query path; accept both.
fn field<'a>(row: &'a Row, bracketed: &str, plain: &str) -> Option<&'a Value> {
    row.get(bracketed)
        .filter(|value| !value.is_null())
        .or_else(|| row.get(plain).filter(|value| !value.is_null()))
}

fn text_field(row: &Row, bracketed: &str, plain: &str) -> Option<String> {
    field(row, bracketed, plain)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Parses one row. Rows without a table or column name carry nothing the
/// schema can use and are skipped.
#[must_use]
pub fn from_row(row: &Row) -> Option<ColumnStatistic> {
    let table_name = text_field(row, "[Table Name]", "Table Name")?;
    let column_name = text_field(row, "[Column Name]", "Column Name")?;
    let min = field(row, "[Min]", "Min").cloned();
    let max = field(row, "[Max]", "Max").cloned();
    let cardinality = field(row, "[Cardinality]", "Cardinality").and_then(Value::as_u64);
    Some(ColumnStatistic {
        table_name,
        column_name,
        min,
        max,
        cardinality,
    })
}

/// Parses all rows and applies the synthetic-entity filter.
#[must_use]
pub fn parse_rows(rows: &[Row]) -> Vec<ColumnStatistic> {
    rows.iter()
        .filter_map(from_row)
        .filter(|stat| !is_synthetic_table(&stat.table_name))
        .filter(|stat| !is_internal_column(&stat.column_name))
        .collect()
}
