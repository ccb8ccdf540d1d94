#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exploratory aggregates over the crime occurrence log.
//!
//! Produces the tables behind the usual occurrence charts as a single
//! [`AnalysisReport`]; no plotting happens here.

pub mod aggregate;

use std::path::Path;
use std::sync::Arc;

use crime_risk_analytics_models::{AnalysisParams, AnalysisReport};
use crime_risk_source::progress::ProgressCallback;
use thiserror::Error;

pub use aggregate::analyze;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Reading the occurrence log failed.
    #[error(transparent)]
    Source(#[from] crime_risk_source::SourceError),
}

/// Reads the occurrence log at `path` and analyzes it, finishing
/// `progress` once the report is built.
///
/// # Errors
///
/// * If the file cannot be read or lacks a required column
pub fn analyze_file(
    path: &Path,
    params: &AnalysisParams,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AnalysisReport, AnalyticsError> {
    let log = crime_risk_source::read_occurrences(path, progress)?;
    let mut report = analyze(&log.records, params);
    report.total_rows += log.skipped;
    report.dropped_rows += log.skipped;

    log::info!(
        "Analyzed {} rows ({} dropped), {} crime types",
        report.total_rows,
        report.dropped_rows,
        report.by_crime_type.len()
    );
    progress.finish(format!("analyzed {} rows", report.total_rows));
    Ok(report)
}
