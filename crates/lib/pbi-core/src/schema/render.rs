//! Deterministic rendering of the inferred schema.
//!
//! The output is the primary grounding context handed to an LLM for DAX
//! generation. It must be exhaustive (every table, every column) and
//! stable: the same intermediate structure renders to byte-identical text.

use serde_json::Value;

use super::{ColumnSchema, Relationship, TableSchema};

const DAX_TIPS: [&str; 6] = [
    "## DAX Query Tips",
    "- Use EVALUATE to return a table",
    "- Reference tables with single quotes: 'TableName'",
    "- Reference columns as 'Table'[Column]",
    "- Use SUMMARIZECOLUMNS for grouping and aggregation",
    "- Use TOPN for limiting results",
];

/// Renders the full markdown report for one semantic model.
#[must_use]
pub fn render(
    dataset_name: &str,
    tables: &[TableSchema],
    relationships: &[Relationship],
) -> String {
    let mut lines: Vec<String> = vec![
        format!("# Power BI Semantic Model: {dataset_name}"),
        String::new(),
        "## Overview".to_string(),
        format!(
            "This model contains {} tables that can be queried using DAX.",
            tables.len()
        ),
        String::new(),
        "## Tables and Columns".to_string(),
    ];

    for table in tables {
        lines.push(String::new());
        lines.push(format!("### '{}'", table.name));
        lines.push("| Column | Type | Cardinality | Sample Range |".to_string());
        lines.push("|--------|------|-------------|--------------|".to_string());
        for column in &table.columns {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                column.name,
                column.data_type,
                cardinality_text(column.cardinality),
                sample_range(column),
            ));
        }
    }

    if !relationships.is_empty() {
        lines.push(String::new());
        lines.push("## Inferred Relationships".to_string());
        lines.push(
            "The following key columns appear in multiple tables, suggesting relationships:"
                .to_string(),
        );
        for relationship in relationships {
            lines.push(format!(
                "- **{}**: links {}",
                relationship.key_column,
                relationship.tables.join(" <-> ")
            ));
        }
    }

    lines.push(String::new());
    lines.extend(DAX_TIPS.iter().map(ToString::to_string));

    lines.join("\n")
}

fn cardinality_text(cardinality: Option<u64>) -> String {
    cardinality.map_or_else(|| "N/A".to_string(), |count| count.to_string())
}

/// `"{min} to {max}"` when both bounds are present, else `N/A`. An empty
/// string bound counts as absent.
fn sample_range(column: &ColumnSchema) -> String {
    match (present(column.min.as_ref()), present(column.max.as_ref())) {
        (Some(min), Some(max)) => format!("{min} to {max}"),
        _ => "N/A".to_string(),
    }
}

fn present(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(text) if text.is_empty() => return None,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use serde_json::json;

    fn column(name: &str, data_type: DataType, min: Value, max: Value) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            data_type,
            min: Some(min),
            max: Some(max),
            cardinality: Some(3),
        }
    }

    fn sales_table() -> TableSchema {
        TableSchema {
            name: "Sales".to_string(),
            columns: vec![
                column("Amount", DataType::Number, json!(1), json!(90)),
                ColumnSchema {
                    name: "Notes".to_string(),
                    data_type: DataType::Unknown,
                    min: None,
                    max: None,
                    cardinality: None,
                },
            ],
        }
    }

    #[test]
    fn empty_model_renders_zero_tables_without_relationships_section() {
        let text = render("Empty", &[], &[]);
        assert!(text.starts_with("# Power BI Semantic Model: Empty"));
        assert!(text.contains("This model contains 0 tables"));
        assert!(!text.contains("## Inferred Relationships"));
        assert!(text.contains("## DAX Query Tips"));
    }

    #[test]
    fn table_section_lists_every_column() {
        let text = render("Sales Model", &[sales_table()], &[]);
        assert!(text.contains("### 'Sales'"));
        assert!(text.contains("| Amount | Number | 3 | 1 to 90 |"));
        assert!(text.contains("| Notes | Unknown | N/A | N/A |"));
    }

    #[test]
    fn relationships_section_links_tables() {
        let relationships = vec![Relationship {
            key_column: "CustomerID".to_string(),
            tables: vec!["Sales".to_string(), "Customers".to_string()],
        }];
        let text = render("M", &[sales_table()], &relationships);
        assert!(text.contains("## Inferred Relationships"));
        assert!(text.contains("- **CustomerID**: links Sales <-> Customers"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let tables = [sales_table()];
        assert_eq!(render("M", &tables, &[]), render("M", &tables, &[]));
    }

    #[test]
    fn zero_bound_still_renders_a_range() {
        let table = TableSchema {
            name: "T".to_string(),
            columns: vec![column("N", DataType::Number, json!(0), json!(5))],
        };
        let text = render("M", &[table], &[]);
        assert!(text.contains("| N | Number | 3 | 0 to 5 |"));
    }

    #[test]
    fn string_bounds_render_unquoted() {
        let table = TableSchema {
            name: "T".to_string(),
            columns: vec![column(
                "Name",
                DataType::Text,
                json!("Alice"),
                json!("Zoe"),
            )],
        };
        let text = render("M", &[table], &[]);
        assert!(text.contains("| Name | Text | 3 | Alice to Zoe |"));
    }
}
