//! Domain models for the deliverystats pipeline.
//!
//! - [`Cell`] - one typed value of a table
//! - [`Table`] - column names plus rows aligned with them
//! - [`SourceKind`] - the three input sources and the columns each must carry

use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;

// =============================================================================
// Column names
// =============================================================================

pub const ORDER_ID: &str = "order_id";
pub const USER_ID: &str = "user_id";
pub const RESTAURANT_ID: &str = "restaurant_id";
pub const ORDER_DATE: &str = "order_date";
pub const TOTAL_AMOUNT: &str = "total_amount";
pub const MEMBERSHIP: &str = "membership";
pub const CITY: &str = "city";
pub const RESTAURANT_NAME: &str = "restaurant_name";
pub const CUISINE: &str = "cuisine";
pub const RATING: &str = "rating";
pub const RATING_RANGE: &str = "rating_range";
pub const QUARTER: &str = "quarter";

// =============================================================================
// Cell
// =============================================================================

/// A single value in a [`Table`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell. Text is not coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Canonical string form used to match keys across sources.
    ///
    /// `7`, `7.0` and `"7"` all map to `"7"`. Returns `None` for nulls and
    /// for values that cannot serve as a key (fractional floats, booleans,
    /// timestamps).
    pub fn join_key(&self) -> Option<String> {
        match self {
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some((*f as i64).to_string())
            }
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            _ => None,
        }
    }

    /// Label used when this cell is a group key.
    pub fn group_label(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Float(f) if f.is_nan() => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::DateTime(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Cell::Float(_) => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::DateTime(_) => serializer.collect_str(self),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Float(f)
    }
}

// =============================================================================
// Table
// =============================================================================

/// One row, aligned with [`Table::columns`].
pub type Row = Vec<Cell>;

/// An in-memory table with a fixed column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and rows. Rows shorter than the
    /// header are padded with nulls.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `column`), `None` if either is out of range.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate over the cells of one column.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Append a column computed from each row.
    pub fn push_column<F>(&mut self, name: impl Into<String>, mut derive: F)
    where
        F: FnMut(&Row) -> Cell,
    {
        for row in &mut self.rows {
            let cell = derive(row);
            row.push(cell);
        }
        self.columns.push(name.into());
    }

    /// Replace a column in place, or append it when absent.
    pub fn set_column<F>(&mut self, name: &str, mut derive: F)
    where
        F: FnMut(&Row) -> Cell,
    {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    let cell = derive(row);
                    row[idx] = cell;
                }
            }
            None => self.push_column(name, derive),
        }
    }

    /// The first `n` rows as JSON objects, for previews.
    pub fn head_json(&self, n: usize) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.clone(), serde_json::to_value(v).unwrap_or_default()))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

// =============================================================================
// Sources
// =============================================================================

/// The three input sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Delimited text, one order per row.
    Orders,
    /// JSON array of user records.
    Users,
    /// SQL schema + seed script with a restaurants table.
    Restaurants,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Orders => "orders",
            SourceKind::Users => "users",
            SourceKind::Restaurants => "restaurants",
        }
    }

    /// Columns the source must provide.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Orders => &[ORDER_ID, USER_ID, RESTAURANT_ID, ORDER_DATE, TOTAL_AMOUNT],
            SourceKind::Users => &[USER_ID, MEMBERSHIP, CITY],
            SourceKind::Restaurants => &[RESTAURANT_ID, RESTAURANT_NAME, CUISINE, RATING],
        }
    }

    /// Columns used as join keys.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Orders => &[USER_ID, RESTAURANT_ID],
            SourceKind::Users => &[USER_ID],
            SourceKind::Restaurants => &[RESTAURANT_ID],
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_join_key_coerces_numbers_and_text() {
        assert_eq!(Cell::Int(7).join_key().as_deref(), Some("7"));
        assert_eq!(Cell::Float(7.0).join_key().as_deref(), Some("7"));
        assert_eq!(Cell::from(" 7 ").join_key().as_deref(), Some("7"));
        assert_eq!(Cell::from("u1").join_key().as_deref(), Some("u1"));
    }

    #[test]
    fn test_join_key_rejects_unusable_values() {
        assert_eq!(Cell::Null.join_key(), None);
        assert_eq!(Cell::Float(7.5).join_key(), None);
        assert_eq!(Cell::Bool(true).join_key(), None);
        assert_eq!(Cell::from("  ").join_key(), None);
    }

    #[test]
    fn test_datetime_display() {
        let midnight = NaiveDate::from_ymd_opt(2023, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Cell::DateTime(midnight).to_string(), "2023-02-01");

        let afternoon = NaiveDate::from_ymd_opt(2023, 2, 1)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap();
        assert_eq!(Cell::DateTime(afternoon).to_string(), "2023-02-01 14:30:05");
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(Cell::Float(500.0).to_string(), "500.0");
        assert_eq!(Cell::Float(4.25).to_string(), "4.25");
    }

    #[test]
    fn test_push_and_set_column() {
        let mut table = Table::from_rows(
            vec!["a".into()],
            vec![vec![Cell::Int(1)], vec![Cell::Int(2)]],
        );
        table.push_column("b", |row| Cell::Int(row[0].as_f64().unwrap() as i64 * 10));
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.get(1, "b"), Some(&Cell::Int(20)));

        table.set_column("a", |_| Cell::Null);
        assert_eq!(table.columns.len(), 2);
        assert!(table.get(0, "a").unwrap().is_null());
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = Table::from_rows(vec!["a".into(), "b".into()], vec![vec![Cell::Int(1)]]);
        assert_eq!(table.rows[0], vec![Cell::Int(1), Cell::Null]);
    }

    #[test]
    fn test_head_json() {
        let table = Table::from_rows(
            vec!["id".into(), "city".into()],
            vec![vec![Cell::Int(1), Cell::from("Pune")]],
        );
        let head = table.head_json(5);
        assert_eq!(head.len(), 1);
        assert_eq!(head[0]["city"], "Pune");
        assert_eq!(head[0]["id"], 1);
    }
}
