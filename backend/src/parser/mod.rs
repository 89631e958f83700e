//! Source readers.
//!
//! Each input source has its own shape but all of them end up as a
//! [`Table`]:
//!
//! - [`tabular`] - delimited text with a header row (orders)
//! - [`hierarchical`] - JSON array of records (users)
//! - [`relational`] - SQL schema + seed script run in memory (restaurants)
//!
//! [`load_source`] picks the reader for a [`SourceKind`] and checks the
//! result against the columns the rest of the pipeline relies on.

pub mod hierarchical;
pub mod relational;
pub mod tabular;

use std::path::Path;

use crate::error::{ParseError, ParseResult, PipelineResult};
use crate::logs::{log_debug, log_info, log_success};
use crate::models::{SourceKind, Table};
use crate::validation::{require_columns, validate_key_columns};

pub use hierarchical::parse_hierarchical;
pub use relational::{load_relational, load_relational_file};
pub use tabular::{parse_tabular, TabularSource};

/// Reader settings shared by [`load_source`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Delimiter for tabular input, auto-detected when `None`.
    pub delimiter: Option<char>,
    /// Table queried after running the relational script.
    pub table_name: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            table_name: "restaurants".to_string(),
        }
    }
}

/// Load one source and check its required and key columns.
pub fn load_source(kind: SourceKind, path: &Path, options: &LoadOptions) -> PipelineResult<Table> {
    log_info(format!("Reading {} from {}", kind, path.display()));

    let table = match kind {
        SourceKind::Orders => {
            let bytes = read_file(path)?;
            let source = parse_tabular(&bytes, options.delimiter)?;
            log_debug(format!(
                "{}: encoding {}, delimiter '{}'",
                kind,
                source.encoding,
                format_delimiter(source.delimiter)
            ));
            source.table
        }
        SourceKind::Users => {
            let bytes = read_file(path)?;
            let content = decode_content(&bytes, &detect_encoding(&bytes))?;
            parse_hierarchical(&content, kind)?
        }
        SourceKind::Restaurants => load_relational_file(path, &options.table_name)?,
    };

    require_columns(&table, kind)?;
    validate_key_columns(&table, kind)?;

    log_success(format!(
        "Loaded {} {} rows ({} columns)",
        table.len(),
        kind,
        table.columns.len()
    ));
    log_debug(format!(
        "{} preview: {}",
        kind,
        serde_json::to_string(&table.head_json(5)).unwrap_or_default()
    ));

    Ok(table)
}

/// Read a whole file, tagging errors with its path.
pub fn read_file(path: &Path) -> ParseResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Detect the encoding of raw bytes using chardet
///
/// Input that is already valid UTF-8 is taken as such; short files with a
/// few multi-byte characters otherwise confuse the detector.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given encoding label.
///
/// Invalid UTF-8 falls back to Windows-1252, which accepts any byte.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ParseResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        },
        label => {
            // "latin-1" is not a WHATWG label; iso-8859-1 resolves to windows-1252
            let label = if label == "latin-1" { "iso-8859-1" } else { label };
            let enc = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or_else(|| ParseError::Encoding(format!("unsupported encoding '{}'", label)))?;
            enc.decode(bytes).0.into_owned()
        }
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_single_column_defaults_to_comma() {
        assert_eq!(detect_delimiter("order_id\n1"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Café" in ISO-8859-1
        let bytes: &[u8] = &[0x43, 0x61, 0x66, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Café");
    }

    #[test]
    fn test_latin1_labels_keep_currency_sign() {
        // 0xA4 is the generic currency sign in Latin-1, not the euro
        let bytes: &[u8] = &[0x31, 0x30, 0xA4];
        for label in ["iso-8859-1", "latin-1", "latin1", "ISO-8859-1"] {
            assert_eq!(decode_content(bytes, label).unwrap(), "10¤", "{label}");
        }
    }

    #[test]
    fn test_invalid_utf8_falls_back() {
        let bytes: &[u8] = &[0x43, 0x61, 0x66, 0xE9];
        let decoded = decode_content(bytes, "utf-8").unwrap();
        assert!(decoded.starts_with("Caf"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let bytes = "\u{feff}a,b".as_bytes();
        assert_eq!(decode_content(bytes, "utf-8").unwrap(), "a,b");
    }

    #[test]
    fn test_unknown_encoding_is_an_error() {
        let err = decode_content(b"abc", "klingon-1").unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }

    #[test]
    fn test_load_source_requires_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "order_id,user_id\n1,u1\n").unwrap();

        let err = load_source(SourceKind::Orders, &path, &LoadOptions::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("load stage"));
        assert!(msg.contains("restaurant_id"));
    }

    #[test]
    fn test_load_source_missing_file() {
        let err = load_source(
            SourceKind::Users,
            Path::new("/definitely/not/here.json"),
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
