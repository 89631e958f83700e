//! Relational script reader.
//!
//! The script is run against a throwaway in-memory SQLite database, the
//! requested table is read back in full, and the connection is dropped
//! before returning.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;

use crate::error::{ExecutionError, ExecutionResult};
use crate::models::{Cell, Table};

/// Read a script from disk and load `table` from it.
pub fn load_relational_file(path: &Path, table: &str) -> ExecutionResult<Table> {
    let script = std::fs::read_to_string(path).map_err(|source| ExecutionError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_relational(&script, table)
}

/// Run `script` in memory and return every row of `table`.
pub fn load_relational(script: &str, table: &str) -> ExecutionResult<Table> {
    let conn = Connection::open_in_memory().map_err(ExecutionError::Open)?;
    conn.execute_batch(script).map_err(ExecutionError::Script)?;

    let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql).map_err(|e| query_error(table, e))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(|e| query_error(table, e))?;
    while let Some(row) = cursor.next().map_err(|e| query_error(table, e))? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let value = row.get_ref(i).map_err(|e| query_error(table, e))?;
            cells.push(cell_from_sql(value));
        }
        rows.push(cells);
    }

    Ok(Table::from_rows(columns, rows))
}

fn query_error(table: &str, source: rusqlite::Error) -> ExecutionError {
    ExecutionError::Query {
        table: table.to_string(),
        source,
    }
}

fn cell_from_sql(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Int(i),
        ValueRef::Real(f) => Cell::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Cell::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        CREATE TABLE restaurants (
            restaurant_id INTEGER PRIMARY KEY,
            restaurant_name TEXT NOT NULL,
            cuisine TEXT,
            rating REAL
        );
        INSERT INTO restaurants VALUES (1, 'Spice Hub', 'Indian', 4.6);
        INSERT INTO restaurants VALUES (2, 'Dragon Wok', 'Chinese', 3.8);
        INSERT INTO restaurants VALUES (3, 'Nowhere', NULL, NULL);
    "#;

    #[test]
    fn test_script_to_table() {
        let table = load_relational(SCRIPT, "restaurants").unwrap();

        assert_eq!(
            table.columns,
            vec!["restaurant_id", "restaurant_name", "cuisine", "rating"]
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, "restaurant_id"), Some(&Cell::Int(1)));
        assert_eq!(table.get(1, "rating"), Some(&Cell::Float(3.8)));
        assert_eq!(table.get(2, "cuisine"), Some(&Cell::Null));
    }

    #[test]
    fn test_invalid_statement() {
        let err = load_relational("CREATE TABLE restaurants (id INT); INSERT INTO nope VALUES (1);", "restaurants")
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Script(_)));
    }

    #[test]
    fn test_missing_table() {
        let err = load_relational("CREATE TABLE other (id INT);", "restaurants").unwrap_err();
        match err {
            ExecutionError::Query { table, .. } => assert_eq!(table, "restaurants"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_each_call_gets_a_fresh_store() {
        load_relational(SCRIPT, "restaurants").unwrap();
        // Would fail with "table already exists" if the store leaked.
        let table = load_relational(SCRIPT, "restaurants").unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        let err = load_relational_file(Path::new("/no/such/restaurants.sql"), "restaurants").unwrap_err();
        assert!(matches!(err, ExecutionError::Io { .. }));
    }
}
