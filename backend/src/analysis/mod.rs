//! Aggregation over the merged dataset.
//!
//! - [`aggregate`] - generic group-by with filters and reducers
//! - [`queries`] - the fixed query battery
//! - [`report`] - report types, text and JSON rendering

pub mod aggregate;
pub mod queries;
pub mod report;

pub use aggregate::{aggregate, Aggregation, Filter, Groups, Having, Reducer};
pub use queries::run_queries;
pub use report::{Answer, GroupRow, Report, ReportConfig, Section};
