//! Flat-file export of the merged dataset.
//!
//! The whole table is written as comma-separated text: a header row with
//! every column in table order, then one record per row. Null cells become
//! empty fields and timestamps are written in ISO form, so the file reads
//! back through [`crate::parser::parse_tabular`] unchanged.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::ExportError;
use crate::logs::{log_debug, log_success};
use crate::models::Table;

/// Write `table` to `path`, returning the number of data rows written.
///
/// The file is staged next to `path` and renamed into place once complete,
/// so a failed export never leaves a truncated file behind.
pub fn export_csv(table: &Table, path: &Path) -> Result<usize, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    let staging = path.with_extension("csv.part");
    log_debug(format!("Staging export at {}", staging.display()));

    let file = File::create(&staging).map_err(io_err)?;
    let written = match write_csv(table, file) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
    };
    fs::rename(&staging, path).map_err(io_err)?;

    log_success(format!(
        "Exported {} rows x {} columns to {}",
        written,
        table.columns.len(),
        path.display()
    ));
    Ok(written)
}

/// Write `table` as CSV to any writer.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<usize, ExportError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: "<writer>".to_string(),
        source,
    })?;

    Ok(table.len())
}
