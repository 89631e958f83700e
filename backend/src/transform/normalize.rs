//! Field normalization and derived columns.
//!
//! `order_date` arrives as free text in several conventions. Parsing is
//! best effort: each value either becomes a [`Cell::DateTime`] or
//! [`Cell::Null`], no row is dropped and nothing aborts.
//!
//! # Disambiguation rule
//!
//! For numeric dates `A/B/C` (separators `/`, `-` or `.`):
//!
//! | Shape | Reading |
//! |-------|---------|
//! | `YYYY-MM-DD` | year, month, day |
//! | `A/B/YYYY`, `A/B/YY` | day, month, year; month, day, year only if day-first is not a valid date |
//!
//! So `03/04/2023` is 3 April 2023 and `12/25/2023` is 25 December 2023.
//! Two-digit years pivot at 69 (`68` → 2068, `69` → 1969).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::error::SchemaError;
use crate::models::{Cell, Table, ORDER_DATE, QUARTER, RATING, RATING_RANGE};

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{1,4})[/.\-](\d{1,2})[/.\-](\d{1,4})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?)?$",
    )
    .expect("valid date pattern")
});

/// Textual month layouts, tried in order after whitespace is collapsed.
const TEXT_DATE_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %b, %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%Y %b %d",
    "%a, %d %b %Y",
];

const TEXT_DATETIME_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M", "%b %d, %Y %H:%M"];

/// Counters from [`normalize_dates`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    /// Values that hold a timestamp after normalization.
    pub parsed: usize,
    /// Non-empty values that could not be read and became null.
    pub coerced_to_null: usize,
    /// Values that were already null.
    pub missing: usize,
}

/// Parse one free-form date.
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_DATE.captures(&text) {
        let date = numeric_date(&caps[1], &caps[2], &caps[3])?;
        let time = match caps.get(4) {
            Some(hour) => {
                let minute = caps.get(5).map_or("0", |m| m.as_str());
                let second = caps.get(6).map_or("0", |m| m.as_str());
                NaiveTime::from_hms_opt(
                    hour.as_str().parse().ok()?,
                    minute.parse().ok()?,
                    second.parse().ok()?,
                )?
            }
            None => NaiveTime::MIN,
        };
        return Some(date.and_time(time));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.naive_utc());
    }

    TEXT_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(&text, f).ok())
        .or_else(|| {
            TEXT_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(&text, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn numeric_date(a: &str, b: &str, c: &str) -> Option<NaiveDate> {
    let (a_num, b_num, c_num): (u32, u32, u32) = (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?);

    if a.len() == 4 {
        if c.len() > 2 {
            return None;
        }
        return NaiveDate::from_ymd_opt(a_num as i32, b_num, c_num);
    }
    if a.len() > 2 {
        return None;
    }

    let year = match c.len() {
        4 => c_num as i32,
        2 if c_num < 69 => 2000 + c_num as i32,
        2 => 1900 + c_num as i32,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, b_num, a_num).or_else(|| NaiveDate::from_ymd_opt(year, a_num, b_num))
}

/// Normalize one `order_date` cell.
pub fn normalize_date_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::DateTime(dt) => Cell::DateTime(*dt),
        Cell::Text(s) => parse_order_date(s).map(Cell::DateTime).unwrap_or(Cell::Null),
        _ => Cell::Null,
    }
}

/// Replace `order_date` with parsed timestamps.
///
/// Running this on an already normalized table changes nothing. A table
/// without an `order_date` column is a [`SchemaError`].
pub fn normalize_dates(mut table: Table) -> Result<(Table, NormalizeStats), SchemaError> {
    let idx = table
        .column_index(ORDER_DATE)
        .ok_or_else(|| SchemaError::new("normalize", ORDER_DATE))?;

    let mut stats = NormalizeStats::default();
    for row in &mut table.rows {
        let before = &row[idx];
        let after = normalize_date_cell(before);
        match (before, &after) {
            (_, Cell::DateTime(_)) => stats.parsed += 1,
            (Cell::Null, _) => stats.missing += 1,
            _ => stats.coerced_to_null += 1,
        }
        row[idx] = after;
    }

    Ok((table, stats))
}

// =============================================================================
// Rating buckets
// =============================================================================

/// Fixed rating bucket.
///
/// Intervals are closed: `[3.0, 3.5]`, `[3.6, 4.0]`, `[4.1, 4.5]`. Any
/// other value, including ratings below 3.0, values in the gaps between
/// buckets (e.g. 3.55) and missing ratings, lands in [`RatingRange::Top`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RatingRange {
    Low,
    Mid,
    High,
    Top,
}

impl RatingRange {
    pub const ALL: [RatingRange; 4] = [
        RatingRange::Low,
        RatingRange::Mid,
        RatingRange::High,
        RatingRange::Top,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RatingRange::Low => "3.0–3.5",
            RatingRange::Mid => "3.6–4.0",
            RatingRange::High => "4.1–4.5",
            RatingRange::Top => "4.6–5.0",
        }
    }

    pub fn from_rating(rating: Option<f64>) -> Self {
        match rating {
            Some(r) if (3.0..=3.5).contains(&r) => RatingRange::Low,
            Some(r) if (3.6..=4.0).contains(&r) => RatingRange::Mid,
            Some(r) if (4.1..=4.5).contains(&r) => RatingRange::High,
            _ => RatingRange::Top,
        }
    }
}

impl fmt::Display for RatingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RatingRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Bucket label for a rating cell.
pub fn rating_range(rating: &Cell) -> Cell {
    Cell::from(RatingRange::from_rating(rating.as_f64()).label())
}

/// Calendar quarter label such as `2023Q1`, null without a date.
pub fn quarter(order_date: &Cell) -> Cell {
    match order_date.as_datetime() {
        Some(dt) => Cell::Text(format!("{}Q{}", dt.year(), dt.month0() / 3 + 1)),
        None => Cell::Null,
    }
}

/// Add (or recompute) `rating_range` and `quarter`.
///
/// Both source columns must be present: without them every bucket and
/// quarter would silently come out as the fallback.
pub fn derive_columns(mut table: Table) -> Result<Table, SchemaError> {
    let index = |column: &str| {
        table
            .column_index(column)
            .ok_or_else(|| SchemaError::new("normalize", column))
    };
    let rating_idx = index(RATING)?;
    let date_idx = index(ORDER_DATE)?;

    table.set_column(RATING_RANGE, |row| rating_range(&row[rating_idx]));
    table.set_column(QUARTER, |row| quarter(&row[date_idx]));
    Ok(table)
}

/// Full normalizer: dates first, then derived columns.
pub fn normalize(table: Table) -> Result<(Table, NormalizeStats), SchemaError> {
    let (table, stats) = normalize_dates(table)?;
    Ok((derive_columns(table)?, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_day_first() {
        assert_eq!(parse_order_date("01/02/2023"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_order_date("03/04/2023"), Some(ymd(2023, 4, 3)));
        assert_eq!(parse_order_date("15-08-2023"), Some(ymd(2023, 8, 15)));
        assert_eq!(parse_order_date("5.6.2023"), Some(ymd(2023, 6, 5)));
    }

    #[test]
    fn test_month_first_fallback() {
        assert_eq!(parse_order_date("12/25/2023"), Some(ymd(2023, 12, 25)));
    }

    #[test]
    fn test_iso_is_year_first() {
        assert_eq!(parse_order_date("2023-02-01"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_order_date("2023/11/30"), Some(ymd(2023, 11, 30)));
    }

    #[test]
    fn test_with_time() {
        let expected = NaiveDate::from_ymd_opt(2023, 2, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_order_date("2023-02-01 14:30:00"), Some(expected));
        assert_eq!(parse_order_date("01/02/2023 14:30"), Some(expected));
        assert_eq!(parse_order_date("2023-02-01T14:30:00"), Some(expected));
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(parse_order_date("01/02/23"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_order_date("01/02/99"), Some(ymd(1999, 2, 1)));
    }

    #[test]
    fn test_text_months() {
        assert_eq!(parse_order_date("01 Feb 2023"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_order_date("1 February 2023"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_order_date("Feb 01, 2023"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_order_date("  Feb   1   2023 "), Some(ymd(2023, 2, 1)));
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(parse_order_date(""), None);
        assert_eq!(parse_order_date("not a date"), None);
        assert_eq!(parse_order_date("31/31/2023"), None);
        assert_eq!(parse_order_date("2023-13-45"), None);
        assert_eq!(parse_order_date("01/02/203"), None);
    }

    #[test]
    fn test_normalize_dates_coerces() {
        let table = Table::from_rows(
            vec!["order_id".into(), "order_date".into()],
            vec![
                vec![Cell::Int(1), Cell::from("01/02/2023")],
                vec![Cell::Int(2), Cell::from("garbage")],
                vec![Cell::Int(3), Cell::Null],
            ],
        );
        let (table, stats) = normalize_dates(table).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, "order_date"), Some(&Cell::DateTime(ymd(2023, 2, 1))));
        assert_eq!(table.get(1, "order_date"), Some(&Cell::Null));
        assert_eq!(
            stats,
            NormalizeStats {
                parsed: 1,
                coerced_to_null: 1,
                missing: 1
            }
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = Table::from_rows(
            vec!["order_date".into(), "rating".into()],
            vec![
                vec![Cell::from("03/04/2023"), Cell::Float(4.2)],
                vec![Cell::from("bad"), Cell::Float(3.1)],
                vec![Cell::from("2023-12-31 23:59:59"), Cell::Null],
            ],
        );
        let (once, _) = normalize(table).unwrap();
        let (twice, _) = normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_exported_text_reparses_to_same_value() {
        let dt = ymd(2023, 2, 1);
        let text = Cell::DateTime(dt).to_string();
        assert_eq!(parse_order_date(&text), Some(dt));
    }

    #[test]
    fn test_rating_buckets() {
        assert_eq!(RatingRange::from_rating(Some(3.0)), RatingRange::Low);
        assert_eq!(RatingRange::from_rating(Some(3.5)), RatingRange::Low);
        assert_eq!(RatingRange::from_rating(Some(3.6)), RatingRange::Mid);
        assert_eq!(RatingRange::from_rating(Some(4.0)), RatingRange::Mid);
        assert_eq!(RatingRange::from_rating(Some(4.1)), RatingRange::High);
        assert_eq!(RatingRange::from_rating(Some(4.5)), RatingRange::High);
        assert_eq!(RatingRange::from_rating(Some(4.6)), RatingRange::Top);
        assert_eq!(RatingRange::from_rating(Some(5.0)), RatingRange::Top);
    }

    #[test]
    fn test_rating_fallthrough() {
        assert_eq!(RatingRange::from_rating(Some(2.4)), RatingRange::Top);
        assert_eq!(RatingRange::from_rating(Some(3.55)), RatingRange::Top);
        assert_eq!(RatingRange::from_rating(None), RatingRange::Top);
    }

    #[test]
    fn test_rating_range_labels_are_fixed() {
        let labels: Vec<&str> = RatingRange::ALL.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["3.0–3.5", "3.6–4.0", "4.1–4.5", "4.6–5.0"]);
        for rating in [0.0, 2.9, 3.0, 3.3, 3.7, 4.05, 4.4, 4.9, 7.0] {
            let cell = rating_range(&Cell::Float(rating));
            assert!(labels.contains(&cell.as_str().unwrap()));
        }
    }

    #[test]
    fn test_quarter() {
        assert_eq!(quarter(&Cell::DateTime(ymd(2023, 2, 1))), Cell::from("2023Q1"));
        assert_eq!(quarter(&Cell::DateTime(ymd(2023, 6, 30))), Cell::from("2023Q2"));
        assert_eq!(quarter(&Cell::DateTime(ymd(2023, 7, 1))), Cell::from("2023Q3"));
        assert_eq!(quarter(&Cell::DateTime(ymd(2024, 12, 31))), Cell::from("2024Q4"));
        assert_eq!(quarter(&Cell::Null), Cell::Null);
    }

    #[test]
    fn test_derived_columns_are_appended() {
        let table = Table::from_rows(
            vec!["order_date".into(), "rating".into()],
            vec![vec![Cell::from("01/02/2023"), Cell::Float(4.6)]],
        );
        let (table, _) = normalize(table).unwrap();
        assert_eq!(table.columns, vec!["order_date", "rating", "rating_range", "quarter"]);
        assert_eq!(table.get(0, "rating_range"), Some(&Cell::from("4.6–5.0")));
        assert_eq!(table.get(0, "quarter"), Some(&Cell::from("2023Q1")));
    }

    #[test]
    fn test_missing_order_date_column() {
        let table = Table::from_rows(
            vec!["order_id".into(), "rating".into()],
            vec![vec![Cell::Int(1), Cell::Float(4.6)]],
        );
        let err = normalize(table).unwrap_err();
        assert_eq!(err.column, "order_date");
    }

    #[test]
    fn test_missing_rating_column() {
        let table = Table::from_rows(
            vec!["order_date".into()],
            vec![vec![Cell::from("01/02/2023")]],
        );
        let err = normalize(table.clone()).unwrap_err();
        assert_eq!(err.column, "rating");
        assert_eq!(derive_columns(table).unwrap_err().column, "rating");
    }
}
