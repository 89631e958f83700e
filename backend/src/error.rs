//! Error types for the deliverystats pipeline.
//!
//! One error type per stage:
//!
//! - [`ParseError`] - source files that cannot be read into a table
//! - [`ExecutionError`] - the relational seed script failed
//! - [`MergeError`] - a join would break the one-row-per-order guarantee
//! - [`SchemaError`] - normalization or an aggregation references a column the table lacks
//! - [`ExportError`] - the merged table could not be written
//! - [`PipelineError`] - top-level wrapper naming the failing stage
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries.

use thiserror::Error;

// =============================================================================
// Source Parsing Errors
// =============================================================================

/// Errors while reading the tabular or hierarchical sources.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Bytes could not be decoded with the detected encoding.
    #[error("Failed to decode input: {0}")]
    Encoding(String),

    /// File has no header row.
    #[error("Input is empty")]
    EmptyInput,

    /// A row does not have as many fields as the header.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Delimiter the CSV reader cannot use.
    #[error("Delimiter '{0}' is not a single ASCII character")]
    Delimiter(char),

    /// Low-level CSV reader failure.
    #[error("Invalid delimited text: {0}")]
    Csv(#[from] csv::Error),

    /// Hierarchical input is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A hierarchical record does not match the expected record shape.
    #[error("Record {record}: {}", .errors.join("; "))]
    SchemaMismatch { record: usize, errors: Vec<String> },

    /// A column every record of this source must carry is absent.
    #[error("Source '{source_name}' has no '{column}' column")]
    MissingColumn { source_name: String, column: String },

    /// A join key cell has a type that cannot be compared across sources.
    #[error("Source '{source_name}', row {row}: join key '{column}' has unusable value {value}")]
    InvalidKey {
        source_name: String,
        column: String,
        row: usize,
        value: String,
    },
}

// =============================================================================
// Relational Store Errors
// =============================================================================

/// Errors from the ephemeral in-memory relational store.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Failed to read the script file.
    #[error("Failed to read script '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory database could not be opened.
    #[error("Cannot open in-memory store: {0}")]
    Open(#[source] rusqlite::Error),

    /// The schema/seed script contains an invalid statement.
    #[error("Script failed: {0}")]
    Script(#[source] rusqlite::Error),

    /// Reading the table back failed.
    #[error("Query on table '{table}' failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

// =============================================================================
// Merge Errors
// =============================================================================

/// Errors while left-joining the sources.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Join column absent on one side.
    #[error("Join column '{column}' missing from {side} table")]
    MissingKey { column: String, side: &'static str },

    /// Right-side key is not unique, the join would duplicate order rows.
    #[error("Key '{key}' appears more than once in '{column}' of the {side} table")]
    DuplicateKey {
        column: String,
        side: &'static str,
        key: String,
    },
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// A stage needs a column the table does not have.
#[derive(Debug, Error)]
#[error("Query '{query}' references missing column '{column}'")]
pub struct SchemaError {
    pub query: String,
    pub column: String,
}

impl SchemaError {
    pub fn new(query: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            column: column.into(),
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the merged table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writer error.
    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error returned by [`crate::transform::pipeline::run`].
/// The message always names the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tabular or hierarchical source failed to load.
    #[error("load stage: {0}")]
    Parse(#[from] ParseError),

    /// Relational source failed to load.
    #[error("load stage: {0}")]
    Execution(#[from] ExecutionError),

    /// Join failed.
    #[error("merge stage: {0}")]
    Merge(#[from] MergeError),

    /// Merged table lacks a column the normalizer derives from.
    #[error("normalize stage: {0}")]
    Normalize(SchemaError),

    /// Aggregation misconfigured.
    #[error("aggregate stage: {0}")]
    Schema(#[from] SchemaError),

    /// Export failed.
    #[error("export stage: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for the relational loader.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
