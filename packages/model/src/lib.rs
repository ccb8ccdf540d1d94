#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The trained crime risk classifier and the artifact bundle it ships in.
//!
//! [`RiskModel`] is the seam between the prediction service and the
//! learner: the service only ever asks for a probability. The concrete
//! implementation is a gradient-boosted tree ensemble ([`GbdtRiskModel`])
//! fitted with log-likelihood loss.

pub mod bundle;

use crime_risk_crime_models::{Context, LabeledContext};
use gbdt::config::Config;
use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

pub use bundle::{ArtifactBundle, BUNDLE_FORMAT_VERSION, BundleError};

/// A trained classifier mapping a context to the probability that an
/// occurrence is recorded there.
pub trait RiskModel: Send + Sync {
    /// Returns a probability in `[0, 1]`.
    fn predict_probability(&self, context: &Context) -> f64;

    /// Scores many contexts at once.
    fn predict_batch(&self, contexts: &[Context]) -> Vec<f64> {
        contexts
            .iter()
            .map(|context| self.predict_probability(context))
            .collect()
    }
}

/// Boosting hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GbdtParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Maximum depth of each tree.
    pub max_depth: u32,
    /// Shrinkage applied to each tree's contribution.
    pub learning_rate: f32,
    /// Minimum number of samples in a leaf.
    pub min_leaf_size: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 6,
            learning_rate: 0.3,
            min_leaf_size: 1,
        }
    }
}

/// Gradient-boosted trees over the seven context features.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct GbdtRiskModel {
    gbdt: GBDT,
}

impl std::fmt::Debug for GbdtRiskModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GbdtRiskModel").finish_non_exhaustive()
    }
}

impl GbdtRiskModel {
    /// Fits a model on `examples`.
    ///
    /// `positive_weight` is the per-sample weight of positive examples
    /// (`scale_pos_weight`); negatives weigh 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn fit(examples: &[LabeledContext], params: &GbdtParams, positive_weight: f64) -> Self {
        let mut cfg = Config::new();
        cfg.set_feature_size(Context::FEATURE_COUNT);
        cfg.set_max_depth(params.max_depth);
        cfg.set_iterations(params.n_estimators);
        cfg.set_shrinkage(params.learning_rate);
        cfg.set_min_leaf_size(params.min_leaf_size);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);

        let positive_weight = positive_weight as f32;
        let mut training_data: Vec<Data> = examples
            .iter()
            .map(|example| {
                let (weight, label) = if example.target.is_positive() {
                    (positive_weight, 1.0)
                } else {
                    (1.0, -1.0)
                };
                Data::new_training_data(example.context.features().to_vec(), weight, label, None)
            })
            .collect();

        log::debug!(
            "Fitting {} trees (depth {}, lr {}) on {} examples",
            params.n_estimators,
            params.max_depth,
            params.learning_rate,
            training_data.len()
        );

        let mut gbdt = GBDT::new(&cfg);
        gbdt.fit(&mut training_data);

        Self { gbdt }
    }
}

impl RiskModel for GbdtRiskModel {
    fn predict_probability(&self, context: &Context) -> f64 {
        self.predict_batch(std::slice::from_ref(context))
            .first()
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn predict_batch(&self, contexts: &[Context]) -> Vec<f64> {
        if contexts.is_empty() {
            return Vec::new();
        }
        let data: Vec<Data> = contexts
            .iter()
            .map(|context| Data::new_test_data(context.features().to_vec(), None))
            .collect();
        self.gbdt
            .predict(&data)
            .into_iter()
            .map(f64::from)
            .collect()
    }
}
