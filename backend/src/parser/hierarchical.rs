//! JSON record reader.
//!
//! Accepts a top-level array of objects, one per record. Every record is
//! checked against the record schema of its source before being flattened
//! into table columns (union of keys, first-seen order).

use serde_json::Value;

use crate::error::{ParseError, ParseResult};
use crate::models::{Cell, SourceKind, Table};
use crate::validation::validate_record;

/// Parse a JSON document into a table.
pub fn parse_hierarchical(content: &str, kind: SourceKind) -> ParseResult<Table> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let document: Value = serde_json::from_str(content)?;
    let records = match document {
        Value::Array(records) => records,
        other => {
            return Err(ParseError::SchemaMismatch {
                record: 0,
                errors: vec![format!(
                    "expected an array of records, found {}",
                    json_type(&other)
                )],
            })
        }
    };

    let mut columns: Vec<String> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        validate_record(kind, record)
            .map_err(|errors| ParseError::SchemaMismatch { record: i, errors })?;

        if let Value::Object(obj) = record {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(c).map(cell_from_json).unwrap_or(Cell::Null))
                .collect()
        })
        .collect();

    Ok(Table::from_rows(columns, rows))
}

/// Convert a scalar JSON value. Nested values never reach here, the record
/// schema rejects them.
fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        },
        Value::String(s) => Cell::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => Cell::Text(value.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
