//! Source validation.
//!
//! Two kinds of checks run on freshly loaded sources:
//!
//! - JSON Schema (Draft 7) validation of hierarchical records, against the
//!   schemas embedded from `schemas/`:
//!   - `user-record.json` - users must carry `user_id`, `membership`, `city`
//!   - `flat-record.json` - any other record must be flat (scalar fields only)
//! - Column checks on the resulting [`Table`]: required columns are present
//!   and join-key cells can be compared across sources.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use deliverystats::validation::validate_user_record;
//!
//! let user = json!({ "user_id": "u1", "membership": "Gold", "city": "Pune" });
//! assert!(validate_user_record(&user).is_ok());
//! ```

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{ParseError, ParseResult};
use crate::models::{Cell, SourceKind, Table};

static USER_RECORD: Lazy<Validator> = Lazy::new(|| {
    compile(include_str!("../../schemas/user-record.json"))
});

static FLAT_RECORD: Lazy<Validator> = Lazy::new(|| {
    compile(include_str!("../../schemas/flat-record.json"))
});

fn compile(raw: &str) -> Validator {
    let schema: Value = serde_json::from_str(raw).expect("Invalid embedded schema");
    jsonschema::draft7::new(&schema).expect("Invalid embedded schema")
}

/// Validate one user record.
pub fn validate_user_record(data: &Value) -> Result<(), Vec<String>> {
    collect_errors(&USER_RECORD, data)
}

/// Validate that a record only holds scalar fields.
pub fn validate_flat_record(data: &Value) -> Result<(), Vec<String>> {
    collect_errors(&FLAT_RECORD, data)
}

/// Validate a hierarchical record of the given source.
pub fn validate_record(kind: SourceKind, data: &Value) -> Result<(), Vec<String>> {
    match kind {
        SourceKind::Users => validate_user_record(data),
        SourceKind::Orders | SourceKind::Restaurants => validate_flat_record(data),
    }
}

fn collect_errors(validator: &Validator, data: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Fail if the table lacks a column the source must provide.
pub fn require_columns(table: &Table, kind: SourceKind) -> ParseResult<()> {
    match kind
        .required_columns()
        .iter()
        .find(|c| !table.has_column(c))
    {
        Some(missing) => Err(ParseError::MissingColumn {
            source_name: kind.name().to_string(),
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// Fail if a join-key cell cannot be turned into a comparable key.
///
/// Nulls are allowed (they simply never match). Integers, integral floats
/// and non-blank text are fine; anything else would make the join silently
/// miss rows.
pub fn validate_key_columns(table: &Table, kind: SourceKind) -> ParseResult<()> {
    for column in kind.key_columns() {
        let Some(cells) = table.column(column) else {
            continue;
        };
        for (row, cell) in cells.enumerate() {
            if !cell.is_null() && cell.join_key().is_none() {
                return Err(ParseError::InvalidKey {
                    source_name: kind.name().to_string(),
                    column: column.to_string(),
                    row,
                    value: format!("{:?}", cell),
                });
            }
        }
    }
    Ok(())
}

/// Whether every non-null key of a column has the same underlying kind.
///
/// Mixed integer/text keys still join after coercion; this is reported as
/// a warning by the pipeline.
pub fn key_kinds(table: &Table, column: &str) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    if let Some(cells) = table.column(column) {
        for cell in cells {
            let kind = match cell {
                Cell::Int(_) | Cell::Float(_) => "number",
                Cell::Text(_) => "text",
                _ => continue,
            };
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_user() {
        let user = json!({ "user_id": "u1", "membership": "Gold", "city": "Hyderabad", "age": 30 });
        assert!(validate_user_record(&user).is_ok());
    }

    #[test]
    fn test_user_with_numeric_id() {
        let user = json!({ "user_id": 42, "membership": "Regular", "city": "Pune" });
        assert!(validate_user_record(&user).is_ok());
    }

    #[test]
    fn test_user_missing_city() {
        let user = json!({ "user_id": "u1", "membership": "Gold" });
        let errors = validate_user_record(&user).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("city")));
    }

    #[test]
    fn test_nested_field_rejected() {
        let record = json!({ "id": 1, "address": { "city": "Pune" } });
        assert!(validate_flat_record(&record).is_err());
    }

    #[test]
    fn test_require_columns() {
        let table = Table::new(vec!["user_id".into(), "membership".into()]);
        let err = require_columns(&table, SourceKind::Users).unwrap_err();
        assert!(err.to_string().contains("city"));

        let table = Table::new(vec!["user_id".into(), "membership".into(), "city".into()]);
        assert!(require_columns(&table, SourceKind::Users).is_ok());
    }

    #[test]
    fn test_fractional_key_rejected() {
        let table = Table::from_rows(
            vec!["user_id".into()],
            vec![vec![Cell::Int(1)], vec![Cell::Float(2.5)]],
        );
        let err = validate_key_columns(&table, SourceKind::Users).unwrap_err();
        match err {
            ParseError::InvalidKey { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "user_id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_key_allowed() {
        let table = Table::from_rows(vec!["user_id".into()], vec![vec![Cell::Null]]);
        assert!(validate_key_columns(&table, SourceKind::Users).is_ok());
    }

    #[test]
    fn test_key_kinds() {
        let table = Table::from_rows(
            vec!["user_id".into()],
            vec![vec![Cell::Int(1)], vec![Cell::from("u2")], vec![Cell::Null]],
        );
        assert_eq!(key_kinds(&table, "user_id"), vec!["number", "text"]);
    }
}
