#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Occurrence log and neighborhood coordinate CSV readers.
//!
//! The occurrence log is a presence-only export: one row per recorded
//! crime. Rows that cannot be used (malformed CSV, blank required values)
//! are skipped and counted rather than failing the whole file, mirroring
//! how the pipeline later drops rows with unparseable dates.

pub mod progress;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crime_risk_crime_models::OccurrenceRecord;
use serde::Deserialize;

use crate::progress::ProgressCallback;

/// Errors that can occur while reading source files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error opening the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error that affects the whole file (e.g. unreadable header).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header.
    #[error("Missing required column '{column}'")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },
}

/// Occurrence rows read from a CSV file.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceLog {
    /// Rows with every required value present.
    pub records: Vec<OccurrenceRecord>,
    /// Rows skipped because they were malformed or had blank values.
    pub skipped: u64,
}

/// Coordinates for a neighborhood, from the optional coordinates file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NeighborhoodCoordinates {
    /// Neighborhood name, matching the occurrence log's `bairro`.
    #[serde(rename = "bairro")]
    pub name: String,
    /// City, when the file disambiguates it.
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Columns every occurrence log must carry. Each entry lists the accepted
/// header names for one column.
const REQUIRED_COLUMNS: &[&[&str]] = &[
    &["dia"],
    &["cidade"],
    &["bairro"],
    &["tipo_de_crime", "tipo_crime"],
];

/// Reads the occurrence log at `path`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened, its header cannot
/// be read, or a required column is missing.
pub fn read_occurrences(
    path: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<OccurrenceLog, SourceError> {
    log::info!("Reading occurrences from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_occurrences_from_reader(file, progress)
}

/// Reads an occurrence log from any reader.
///
/// `progress` is advanced once per data row and left running; the caller
/// finishes it when its own work is done.
///
/// # Errors
///
/// Returns [`SourceError`] if the header cannot be read or a required
/// column is missing.
pub fn read_occurrences_from_reader<R: Read>(
    reader: R,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<OccurrenceLog, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for aliases in REQUIRED_COLUMNS {
        if !aliases.iter().any(|name| headers.iter().any(|h| h == *name)) {
            return Err(SourceError::MissingColumn {
                column: aliases[0].to_string(),
            });
        }
    }

    progress.set_message("reading occurrences".to_string());

    let mut log = OccurrenceLog::default();
    for (index, row) in rdr.deserialize::<OccurrenceRecord>().enumerate() {
        progress.inc(1);
        match row {
            Ok(record) if has_required_values(&record) => log.records.push(record),
            Ok(_) => {
                log::debug!("Skipping row {}: blank required value", index + 2);
                log.skipped += 1;
            }
            Err(e) => {
                log::warn!("Skipping row {}: {e}", index + 2);
                log.skipped += 1;
            }
        }
    }

    log::info!(
        "Read {} occurrences ({} skipped)",
        log.records.len(),
        log.skipped
    );

    Ok(log)
}

fn has_required_values(record: &OccurrenceRecord) -> bool {
    [
        &record.date,
        &record.city,
        &record.neighborhood,
        &record.crime_type,
    ]
    .iter()
    .all(|value| !value.trim().is_empty())
}

/// Reads a neighborhood coordinates file (`bairro,latitude,longitude`,
/// optionally `cidade`).
///
/// Malformed rows are skipped with a warning.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened or its header
/// cannot be read.
pub fn read_neighborhood_coordinates(
    path: &Path,
) -> Result<Vec<NeighborhoodCoordinates>, SourceError> {
    log::info!("Reading neighborhood coordinates from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_neighborhood_coordinates_from_reader(file)
}

/// Reads neighborhood coordinates from any reader.
///
/// # Errors
///
/// Returns [`SourceError`] if the header cannot be read.
pub fn read_neighborhood_coordinates_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<NeighborhoodCoordinates>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.headers()?;

    let mut out = Vec::new();
    for row in rdr.deserialize::<NeighborhoodCoordinates>() {
        match row {
            Ok(coords) => out.push(coords),
            Err(e) => log::warn!("Skipping coordinates row: {e}"),
        }
    }
    Ok(out)
}
