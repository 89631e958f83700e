//! Delimited-text reader with encoding and delimiter auto-detection.
//!
//! Rows must all have as many fields as the header; a short or long row
//! aborts the load with [`ParseError::MalformedRow`]. Column types are
//! inferred per column the way a dataframe reader would.

use csv::{ErrorKind, ReaderBuilder, Trim};

use super::{decode_content, detect_delimiter, detect_encoding};
use crate::error::{ParseError, ParseResult};
use crate::models::{Cell, Table};

/// Result of reading delimited text, with the settings that were used.
#[derive(Debug, Clone)]
pub struct TabularSource {
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected or given delimiter
    pub delimiter: char,
}

/// Parse raw bytes. The delimiter is detected from the header when `None`.
pub fn parse_tabular(bytes: &[u8], delimiter: Option<char>) -> ParseResult<TabularSource> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = parse_str(&content, delimiter)?;

    Ok(TabularSource {
        table,
        encoding,
        delimiter,
    })
}

/// Parse already-decoded text with an explicit delimiter.
pub fn parse_str(content: &str, delimiter: char) -> ParseResult<Table> {
    if !delimiter.is_ascii() {
        return Err(ParseError::Delimiter(delimiter));
    }
    if content.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(ParseError::EmptyInput);
    }

    let mut raw: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        raw.push(record.iter().map(str::to_string).collect());
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|i| infer_kind(raw.iter().map(|r| r[i].as_str())))
        .collect();

    let rows = raw
        .into_iter()
        .map(|fields| {
            fields
                .into_iter()
                .zip(&kinds)
                .map(|(field, kind)| kind.cell(field))
                .collect()
        })
        .collect();

    Ok(Table::from_rows(columns, rows))
}

/// Turn a csv error into a [`ParseError`], keeping line numbers for
/// inconsistent rows.
fn malformed(err: csv::Error) -> ParseError {
    if let ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = err.kind()
    {
        return ParseError::MalformedRow {
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    ParseError::Csv(err)
}

/// Type shared by every non-empty value of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Int,
    Float,
    Text,
}

impl ColumnKind {
    fn cell(&self, field: String) -> Cell {
        if field.is_empty() {
            return Cell::Null;
        }
        match self {
            ColumnKind::Int => field.parse().map(Cell::Int).unwrap_or(Cell::Text(field)),
            ColumnKind::Float => field.parse().map(Cell::Float).unwrap_or(Cell::Text(field)),
            ColumnKind::Text => Cell::Text(field),
        }
    }
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Int;
    for value in values.filter(|v| !v.is_empty()) {
        if kind == ColumnKind::Int && value.parse::<i64>().is_ok() {
            continue;
        }
        if value.parse::<f64>().is_ok() {
            kind = ColumnKind::Float;
        } else {
            return ColumnKind::Text;
        }
    }
    kind
}
