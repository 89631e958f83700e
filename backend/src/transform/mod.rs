//! Transformation module.
//!
//! This module turns the loaded sources into the analysis dataset:
//! - Merge: left joins on user and restaurant keys
//! - Normalize: order dates, rating buckets, quarters
//! - Pipeline: load, merge, normalize, aggregate

pub mod merge;
pub mod normalize;
pub mod pipeline;

pub use merge::{left_join, merge, JoinOutcome, MergeStats};
pub use normalize::{normalize, normalize_dates, NormalizeStats, RatingRange};
pub use pipeline::*;
