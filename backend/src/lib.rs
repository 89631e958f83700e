//! # deliverystats - food delivery dataset merge and statistics
//!
//! Joins three heterogeneous sources (orders as delimited text, users as
//! JSON records, restaurants as a SQL seed script) into one flat dataset,
//! normalizes it, runs a fixed battery of aggregation queries and exports
//! the merged table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Sources   │────▶│   Parser    │────▶│  Transform  │────▶│  Analysis   │
//! │ CSV/JSON/SQL│     │ (auto-enc)  │     │ merge + norm│     │  (report)   │
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │ Export CSV  │
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deliverystats::{run_and_export, PipelineOptions};
//!
//! let output = run_and_export(&PipelineOptions::default(), false)?;
//! print!("{}", output.report.render_text());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Stage error types
//! - [`models`] - `Cell`, `Table`, source kinds and column names
//! - [`parser`] - Tabular, hierarchical and relational readers
//! - [`validation`] - Record schemas and column checks
//! - [`transform`] - Merge, normalization and the pipeline
//! - [`analysis`] - Aggregation engine, queries and report
//! - [`export`] - CSV export
//! - [`logs`] - Logging helpers

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Loading
pub mod parser;
pub mod validation;

// Transformation
pub mod transform;

// Aggregation
pub mod analysis;

// Output
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExecutionError, ExportError, MergeError, ParseError, PipelineError, PipelineResult,
    SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Row, SourceKind, Table};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logs::{init_logging, log_debug, log_error, log_info, log_success, log_warning};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, load_relational, load_source,
    parse_hierarchical, parse_tabular, LoadOptions, TabularSource,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::validate_user_record;

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    build_dataset, run, run_and_export, run_tables, PipelineOptions, PipelineOutput, RunSummary,
};
pub use transform::{merge, normalize, MergeStats, NormalizeStats};

// =============================================================================
// Re-exports - Analysis
// =============================================================================

pub use analysis::{aggregate, run_queries, Aggregation, Report, ReportConfig};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export_csv, write_csv};
