//! Type and relationship inference heuristics.
//!
//! These are named pure functions over plain data so their edge cases
//! (the length-8 threshold, the separator set, the key-suffix list) can be
//! exercised without a live service.

use std::collections::HashMap;

use serde_json::Value;

use super::stats::ColumnStatistic;
use super::{ColumnSchema, DataType, Relationship, TableSchema};

const DATE_SEPARATORS: [char; 3] = ['-', '/', ':'];
const MIN_DATE_LEN: usize = 8;

/// The bare `ID` entry also covers camel-case names like `CustomerID` and
/// the standalone column name `ID`.
const KEY_SUFFIXES: [&str; 6] = [" Key", "_Key", " ID", "_ID", "_id", "ID"];

/// Infers a column's type from its minimum value alone.
///
/// A textual minimum is DateTime when it contains a date separator and is
/// at least eight characters long, Text otherwise. False positives like
/// `"12-34-56-78"` are an accepted tradeoff for zero extra queries.
#[must_use]
pub fn infer_type(min: Option<&Value>) -> DataType {
    match min {
        None | Some(Value::Null) => DataType::Unknown,
        Some(Value::Number(_)) => DataType::Number,
        Some(Value::String(text)) => {
            if text.contains(DATE_SEPARATORS) && text.chars().count() >= MIN_DATE_LEN {
                DataType::DateTime
            } else {
                DataType::Text
            }
        }
        Some(_) => DataType::Unknown,
    }
}

/// True for column names matching common foreign/primary-key conventions.
#[must_use]
pub fn is_key_column(name: &str) -> bool {
    KEY_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Groups statistics into tables, preserving first-seen order for tables
/// and for columns within each table.
#[must_use]
pub fn group_tables(statistics: Vec<ColumnStatistic>) -> Vec<TableSchema> {
    let mut tables: Vec<TableSchema> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for stat in statistics {
        let slot = *index.entry(stat.table_name.clone()).or_insert_with(|| {
            tables.push(TableSchema {
                name: stat.table_name.clone(),
                columns: Vec::new(),
            });
            tables.len() - 1
        });
        let data_type = infer_type(stat.min.as_ref());
        tables[slot].columns.push(ColumnSchema {
            name: stat.column_name,
            data_type,
            min: stat.min,
            max: stat.max,
            cardinality: stat.cardinality,
        });
    }

    tables
}

/// Records every key-shaped column name appearing in two or more tables.
/// Both the relationship order and each table list follow first-seen order.
#[must_use]
pub fn infer_relationships(tables: &[TableSchema]) -> Vec<Relationship> {
    let mut key_tables: Vec<(String, Vec<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for table in tables {
        for column in &table.columns {
            if !is_key_column(&column.name) {
                continue;
            }
            let slot = *index.entry(column.name.clone()).or_insert_with(|| {
                key_tables.push((column.name.clone(), Vec::new()));
                key_tables.len() - 1
            });
            key_tables[slot].1.push(table.name.clone());
        }
    }

    key_tables
        .into_iter()
        .filter(|(_, tables)| tables.len() > 1)
        .map(|(key_column, tables)| Relationship { key_column, tables })
        .collect()
}
