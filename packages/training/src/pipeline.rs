//! The offline flow: occurrence CSV → encoders → contexts → labeled table
//! → trained model → artifact bundle.

use std::path::Path;
use std::sync::Arc;

use crime_risk_crime_models::{Context, NeighborhoodRecord, OccurrenceRecord};
use crime_risk_features::{CategoryEncoders, extract_contexts, parse_records};
use crime_risk_model::ArtifactBundle;
use crime_risk_sampler::{
    DataInsufficientError, NeighborhoodCityIndex, SamplingSummary, build_labeled_dataset,
};
use crime_risk_source::progress::ProgressCallback;
use crime_risk_source::{
    NeighborhoodCoordinates, read_neighborhood_coordinates, read_occurrences,
};

use crate::{PipelineConfig, TrainingError, train};

/// Progress steps after the CSV has been read: encode, sample, train,
/// bundle.
const STAGES: u64 = 4;

/// Row accounting for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    /// Rows read from the CSV.
    pub read: usize,
    /// Rows skipped by the reader (malformed or blank required values).
    pub skipped: u64,
    /// Rows dropped because their date or time did not parse.
    pub unparseable: u64,
    /// Rows turned into contexts.
    pub contexts: usize,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The bundle, ready to save.
    pub bundle: ArtifactBundle,
    /// Row accounting.
    pub ingestion: IngestionSummary,
    /// Negative sampling counts.
    pub sampling: SamplingSummary,
}

/// Runs the pipeline on the CSV at `occurrences`, optionally attaching
/// coordinates from `coordinates`.
///
/// # Errors
///
/// * If either file cannot be read
/// * If the data cannot support two-class training
/// * If `config` is out of range
pub fn run(
    occurrences: &Path,
    coordinates: Option<&Path>,
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineOutcome, TrainingError> {
    let log = read_occurrences(occurrences, progress)?;
    let coordinates = coordinates
        .map(read_neighborhood_coordinates)
        .transpose()?
        .unwrap_or_default();

    let mut outcome = build_bundle(&log.records, &coordinates, config, progress)?;
    outcome.ingestion.skipped = log.skipped;
    Ok(outcome)
}

/// Runs the pipeline on records already in memory.
///
/// Each row's date and time are parsed once; encoders are fitted on the
/// rows that parse, so every label in the maps has been seen by the model.
/// `progress` counts [`STAGES`] and is finished when the bundle is built.
///
/// # Errors
///
/// * If the data cannot support two-class training
/// * If `config` is out of range
pub fn build_bundle(
    records: &[OccurrenceRecord],
    coordinates: &[NeighborhoodCoordinates],
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineOutcome, TrainingError> {
    config.trainer.validate()?;

    progress.set_total(STAGES);
    progress.set_message("encoding".to_string());
    let parsed = parse_records(records);
    if parsed.rows.is_empty() {
        return Err(DataInsufficientError {
            reason: "no usable occurrence rows".to_string(),
        }
        .into());
    }

    let encoders = parsed.fit_encoders();
    log::info!(
        "Encoded {} neighborhoods, {} cities, {} crime types",
        encoders.neighborhoods.len(),
        encoders.cities.len(),
        encoders.crime_types.len()
    );
    let contexts = extract_contexts(&parsed.rows, &encoders).contexts;
    progress.inc(1);

    progress.set_message("sampling negatives".to_string());
    let dataset = build_labeled_dataset(&contexts, &config.sampler)?;
    progress.inc(1);

    progress.set_message("training".to_string());
    let trained = train(&dataset.examples, &config.trainer)?;
    progress.inc(1);

    progress.set_message("bundling".to_string());
    let neighborhoods = neighborhood_records(&contexts, &encoders, coordinates);
    let bundle = ArtifactBundle::new(trained.model, encoders, neighborhoods, Some(trained.report))?;
    progress.inc(1);

    progress.finish(format!(
        "trained on {} examples",
        dataset.examples.len()
    ));

    Ok(PipelineOutcome {
        bundle,
        ingestion: IngestionSummary {
            read: records.len(),
            skipped: 0,
            unparseable: parsed.unparseable,
            contexts: contexts.len(),
        },
        sampling: dataset.summary,
    })
}

/// Lists every encoded neighborhood with its city, in neighborhood code
/// order, attaching coordinates when `coordinates` has a matching row.
///
/// A coordinates row matches by name, and by city too when it names one.
#[must_use]
pub fn neighborhood_records(
    contexts: &[Context],
    encoders: &CategoryEncoders,
    coordinates: &[NeighborhoodCoordinates],
) -> Vec<NeighborhoodRecord> {
    let index = NeighborhoodCityIndex::learn(contexts);

    index
        .iter()
        .filter_map(|(neighborhood, city)| {
            let name = encoders.neighborhoods.label(neighborhood)?;
            let city = encoders.cities.label(city)?;
            let coords = coordinates.iter().find(|c| {
                c.name == name && c.city.as_deref().is_none_or(|c_city| c_city == city)
            });
            Some(NeighborhoodRecord {
                name: name.to_string(),
                city: city.to_string(),
                latitude: coords.map(|c| c.latitude),
                longitude: coords.map(|c| c.longitude),
            })
        })
        .collect()
}
