#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Trains and evaluates the crime risk classifier.
//!
//! [`train`] takes a labeled table (positives plus sampled negatives),
//! splits it with class stratification, weights positives by
//! `scale_pos_weight`, fits gradient-boosted trees and scores the held-out
//! split. [`pipeline`] runs the whole offline flow from CSV to bundle.

pub mod metrics;
pub mod pipeline;
pub mod split;

use std::path::Path;

use crime_risk_crime_models::{ClassificationReport, LabeledContext, Target};
use crime_risk_model::{BundleError, GbdtParams, GbdtRiskModel, RiskModel};
use crime_risk_sampler::{DataInsufficientError, SamplerConfig};
use crime_risk_source::SourceError;
use serde::{Deserialize, Serialize};

use crate::metrics::ConfusionMatrix;

pub use split::{Split, stratified_split};

/// Errors that can occur while training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    /// Not enough data for two-class training.
    #[error(transparent)]
    DataInsufficient(#[from] DataInsufficientError),

    /// A hyper-parameter is out of range.
    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    /// The TOML config file is malformed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading the input CSV failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Writing the bundle failed.
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Split and learner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TrainerConfig {
    /// Share of each class held out for evaluation.
    pub test_fraction: f64,
    /// Split seed.
    pub seed: u64,
    /// Boosting hyper-parameters.
    pub gbdt: GbdtParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            gbdt: GbdtParams::default(),
        }
    }
}

impl TrainerConfig {
    /// Checks every setting is in range.
    ///
    /// # Errors
    ///
    /// * [`TrainingError::InvalidConfig`] naming the first bad setting
    pub fn validate(&self) -> Result<(), TrainingError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.gbdt.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig(
                "n_estimators must be positive".to_string(),
            ));
        }
        if self.gbdt.max_depth == 0 {
            return Err(TrainingError::InvalidConfig(
                "max_depth must be positive".to_string(),
            ));
        }
        if !(self.gbdt.learning_rate > 0.0 && self.gbdt.learning_rate.is_finite()) {
            return Err(TrainingError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.gbdt.learning_rate
            )));
        }
        if self.gbdt.min_leaf_size == 0 {
            return Err(TrainingError::InvalidConfig(
                "min_leaf_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything the offline pipeline can be tuned with.
///
/// Loaded from an optional TOML file; every key has a default:
///
/// ```toml
/// [sampler]
/// seed = 42
/// negative_ratio = 2
/// enforce_neighborhood_city = true
///
/// [trainer]
/// test_fraction = 0.2
/// seed = 42
///
/// [trainer.gbdt]
/// n_estimators = 200
/// max_depth = 6
/// learning_rate = 0.3
/// min_leaf_size = 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Negative sampling settings.
    pub sampler: SamplerConfig,
    /// Split and learner settings.
    pub trainer: TrainerConfig,
}

impl PipelineConfig {
    /// Parses a TOML config.
    ///
    /// # Errors
    ///
    /// * If the TOML is malformed or a value has the wrong type
    /// * If a setting is out of range
    pub fn from_toml_str(contents: &str) -> Result<Self, TrainingError> {
        let config: Self = toml::from_str(contents)?;
        config.trainer.validate()?;
        if config.sampler.negative_ratio == 0 {
            return Err(TrainingError::InvalidConfig(
                "negative_ratio must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    /// Reads a TOML config file.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If its contents are invalid (see [`Self::from_toml_str`])
    pub fn load(path: &Path) -> Result<Self, TrainingError> {
        log::info!("Loading training config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Class-imbalance correction: negatives per positive.
///
/// Returns 1.0 when there are no positives.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn scale_pos_weight(negatives: usize, positives: usize) -> f64 {
    if positives == 0 {
        1.0
    } else {
        negatives as f64 / positives as f64
    }
}

/// A fitted model and its held-out evaluation.
#[derive(Debug)]
pub struct TrainedModel {
    /// The classifier.
    pub model: GbdtRiskModel,
    /// Metrics on the test split.
    pub report: ClassificationReport,
}

/// Splits, fits and evaluates.
///
/// # Errors
///
/// * [`TrainingError::InvalidConfig`] if `config` is out of range
/// * [`TrainingError::DataInsufficient`] if either class has fewer than two
///   examples
pub fn train(
    examples: &[LabeledContext],
    config: &TrainerConfig,
) -> Result<TrainedModel, TrainingError> {
    config.validate()?;

    let split = stratified_split(examples, config.test_fraction, config.seed)?;
    let positives = split.train.iter().filter(|e| e.target.is_positive()).count();
    let negatives = split.train.len() - positives;
    let weight = scale_pos_weight(negatives, positives);

    log::info!(
        "Training on {} examples ({positives} positive, {negatives} negative, \
         scale_pos_weight {weight:.3}); holding out {}",
        split.train.len(),
        split.test.len()
    );

    let model = GbdtRiskModel::fit(&split.train, &config.gbdt, weight);
    let report = evaluate(&model, &split.test, weight, split.train.len());

    log::info!("Held-out evaluation: {report}");

    Ok(TrainedModel { model, report })
}

/// Scores `model` on `test`.
#[must_use]
pub fn evaluate(
    model: &dyn RiskModel,
    test: &[LabeledContext],
    scale_pos_weight: f64,
    train_size: usize,
) -> ClassificationReport {
    let contexts: Vec<_> = test.iter().map(|e| e.context).collect();
    let labels: Vec<bool> = test.iter().map(|e| e.target == Target::Occurred).collect();
    let probabilities = model.predict_batch(&contexts);
    let matrix = ConfusionMatrix::from_probabilities(&labels, &probabilities);

    ClassificationReport {
        accuracy: matrix.accuracy(),
        precision: matrix.precision(),
        recall: matrix.recall(),
        f1: matrix.f1(),
        roc_auc: metrics::roc_auc(&labels, &probabilities),
        scale_pos_weight,
        train_size,
        test_size: test.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_risk_crime_models::Context;

    struct ByHour;

    impl RiskModel for ByHour {
        fn predict_probability(&self, context: &Context) -> f64 {
            f64::from(context.hour) / 23.0
        }
    }

    fn at_hour(hour: u8, target: Target) -> LabeledContext {
        let context = Context {
            hour,
            ..Context::default()
        };
        LabeledContext { context, target }
    }

    #[test]
    fn scale_pos_weight_is_negatives_per_positive() {
        assert!((scale_pos_weight(300, 100) - 3.0).abs() < f64::EPSILON);
        assert!((scale_pos_weight(10, 0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn evaluate_reports_hand_computed_metrics() {
        let test = [
            at_hour(23, Target::Occurred),
            at_hour(20, Target::Occurred),
            at_hour(2, Target::Occurred),
            at_hour(1, Target::Absent),
            at_hour(15, Target::Absent),
        ];
        let report = evaluate(&ByHour, &test, 2.5, 20);

        // TP=2 (23, 20), FN=1 (2), TN=1 (1), FP=1 (15)
        assert!((report.accuracy - 0.6).abs() < 1e-9);
        assert!((report.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.recall - 2.0 / 3.0).abs() < 1e-9);
        // Concordant pairs: 23>1, 23>15, 20>1, 20>15, 2>1 = 5 of 6
        assert!((report.roc_auc.unwrap() - 5.0 / 6.0).abs() < 1e-9);
        assert_eq!(report.train_size, 20);
        assert_eq!(report.test_size, 5);
    }

    #[test]
    fn train_produces_a_report() {
        let mut examples = Vec::new();
        for hour in 0..24_u8 {
            for day_of_week in 0..7_u8 {
                let context = Context {
                    day_of_week,
                    hour,
                    ..Context::default()
                };
                let target = if hour >= 18 {
                    Target::Occurred
                } else {
                    Target::Absent
                };
                examples.push(LabeledContext { context, target });
            }
        }
        let config = TrainerConfig {
            gbdt: GbdtParams {
                n_estimators: 20,
                max_depth: 3,
                ..GbdtParams::default()
            },
            ..TrainerConfig::default()
        };

        let trained = train(&examples, &config).unwrap();
        // 42 positives / 126 negatives; 8 and 25 held out
        assert_eq!(trained.report.test_size, 33);
        assert_eq!(trained.report.train_size, 135);
        assert!((trained.report.scale_pos_weight - 101.0 / 34.0).abs() < 1e-9);
        assert!(trained.report.roc_auc.unwrap() > 0.5);
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let config = TrainerConfig {
            test_fraction: 1.0,
            ..TrainerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrainingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn parses_partial_toml() {
        let config = PipelineConfig::from_toml_str(
            r"
            [sampler]
            negative_ratio = 3

            [trainer.gbdt]
            max_depth = 4
            ",
        )
        .unwrap();
        assert_eq!(config.sampler.negative_ratio, 3);
        assert_eq!(config.sampler.seed, 42);
        assert_eq!(config.trainer.gbdt.max_depth, 4);
        assert_eq!(config.trainer.gbdt.n_estimators, 200);
        assert!((config.trainer.test_fraction - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        assert_eq!(
            PipelineConfig::from_toml_str("").unwrap(),
            PipelineConfig::default()
        );
    }

    #[test]
    fn rejects_zero_negative_ratio() {
        let err = PipelineConfig::from_toml_str("[sampler]\nnegative_ratio = 0\n").unwrap_err();
        assert!(matches!(err, TrainingError::InvalidConfig(_)));
    }

    #[test]
    fn bundled_config_matches_defaults() {
        assert_eq!(
            PipelineConfig::from_toml_str(include_str!("../config/default.toml")).unwrap(),
            PipelineConfig::default()
        );
    }
}
