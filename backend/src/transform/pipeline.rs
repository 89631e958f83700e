//! High-level pipeline API: load, merge, normalize, aggregate.
//!
//! # Example
//!
//! ```rust,ignore
//! use deliverystats::transform::pipeline::{run, PipelineOptions};
//!
//! let output = run(&PipelineOptions::default())?;
//! println!("{}", output.report.render_text());
//! ```
//!
//! [`run`] never writes anything. [`run_and_export`] writes the export only
//! once the report is fully computed, so a failing stage leaves no file.

use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::{run_queries, Report, ReportConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::export::export_csv;
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{SourceKind, Table, RESTAURANT_ID, USER_ID};
use crate::parser::{load_source, LoadOptions};
use crate::validation::key_kinds;

use super::merge::{merge, MergeStats};
use super::normalize::{normalize, NormalizeStats};

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub orders_path: PathBuf,
    pub users_path: PathBuf,
    pub restaurants_path: PathBuf,
    /// Where the merged dataset is exported.
    pub export_path: PathBuf,
    pub load: LoadOptions,
    pub report: ReportConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            orders_path: PathBuf::from("data/orders.csv"),
            users_path: PathBuf::from("data/users.json"),
            restaurants_path: PathBuf::from("data/restaurants.sql"),
            export_path: PathBuf::from("final_food_delivery_dataset.csv"),
            load: LoadOptions::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Merged and normalized dataset.
    pub table: Table,
    pub merge_stats: MergeStats,
    pub normalize_stats: NormalizeStats,
    pub report: Report,
}

/// Summary counters, for logs and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub merge: MergeStats,
    pub dates: NormalizeStats,
    pub columns: usize,
}

impl PipelineOutput {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            merge: self.merge_stats,
            dates: self.normalize_stats,
            columns: self.table.columns.len(),
        }
    }
}

/// Load the three sources and run the whole pipeline.
pub fn run(options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
    let orders = load_source(SourceKind::Orders, &options.orders_path, &options.load)?;
    let users = load_source(SourceKind::Users, &options.users_path, &options.load)?;
    let restaurants = load_source(SourceKind::Restaurants, &options.restaurants_path, &options.load)?;

    run_tables(&orders, &users, &restaurants, &options.report)
}

/// [`run`], then write the merged table to `options.export_path`.
pub fn run_and_export(options: &PipelineOptions, skip_export: bool) -> PipelineResult<PipelineOutput> {
    let output = run(options)?;

    if skip_export {
        log_info("Export skipped");
    } else {
        export_csv(&output.table, &options.export_path)?;
    }
    Ok(output)
}

/// Run the pipeline on already loaded sources.
pub fn run_tables(
    orders: &Table,
    users: &Table,
    restaurants: &Table,
    config: &ReportConfig,
) -> PipelineResult<PipelineOutput> {
    let (table, merge_stats, normalize_stats) = build_dataset(orders, users, restaurants)?;

    log_info("Running queries...");
    let report = run_queries(&table, config)?;
    log_success(format!("Computed {} report sections", report.sections.len()));

    Ok(PipelineOutput {
        table,
        merge_stats,
        normalize_stats,
        report,
    })
}

/// Merge and normalize, without aggregating.
pub fn build_dataset(
    orders: &Table,
    users: &Table,
    restaurants: &Table,
) -> PipelineResult<(Table, MergeStats, NormalizeStats)> {
    warn_mixed_keys(USER_ID, &[("orders", orders), ("users", users)]);
    warn_mixed_keys(RESTAURANT_ID, &[("orders", orders), ("restaurants", restaurants)]);

    log_info("Merging sources...");
    let (merged, merge_stats) = merge(orders, users, restaurants)?;
    log_success(format!("Merged {} rows", merge_stats.rows));
    if merge_stats.unmatched_users > 0 {
        log_warning(format!(
            "{} orders have no matching user",
            merge_stats.unmatched_users
        ));
    }
    if merge_stats.unmatched_restaurants > 0 {
        log_warning(format!(
            "{} orders have no matching restaurant",
            merge_stats.unmatched_restaurants
        ));
    }

    let (table, normalize_stats) = normalize(merged).map_err(PipelineError::Normalize)?;
    if normalize_stats.coerced_to_null > 0 {
        log_warning(format!(
            "{} order dates could not be parsed and were set to null",
            normalize_stats.coerced_to_null
        ));
    }
    log_success(format!(
        "Normalized {} order dates, added rating_range and quarter",
        normalize_stats.parsed
    ));

    Ok((table, merge_stats, normalize_stats))
}

/// Key columns holding both numbers and text still join, but say so.
fn warn_mixed_keys(column: &str, sources: &[(&str, &Table)]) {
    let mut seen: Vec<(&str, Vec<&'static str>)> = Vec::new();
    for &(name, table) in sources {
        let kinds = key_kinds(table, column);
        if kinds.len() > 1 {
            log_warning(format!("{}.{} mixes numeric and text keys", name, column));
        }
        seen.push((name, kinds));
    }

    let all: Vec<&str> = seen.iter().flat_map(|(_, k)| k.iter().copied()).collect();
    if all.contains(&"number") && all.contains(&"text") {
        let detail: Vec<String> = seen
            .iter()
            .map(|(name, kinds)| format!("{}={}", name, kinds.join("/")))
            .collect();
        log_warning(format!(
            "{} keys differ in type across sources ({}), matching on their text form",
            column,
            detail.join(", ")
        ));
    }
}
