#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Synthesizes negative contexts from a presence-only occurrence log.
//!
//! The log only records crimes that happened. To train a binary
//! classifier, every distinct observed context becomes a positive example
//! and "no crime" examples are drawn at random from the observed value
//! domains, minus anything that was actually observed.
//!
//! Modeling assumption: because each dimension is sampled from the values
//! that appeared in the log rather than from its full range, negatives
//! lean toward combinations of individually common values. They are an
//! approximation of absence, not a counterfactual.

pub mod domain;

use std::collections::BTreeSet;

use crime_risk_crime_models::{Context, LabeledContext, Target};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub use domain::{NeighborhoodCityIndex, ObservedDomains};

/// The data cannot support two-class training.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("insufficient data: {reason}")]
pub struct DataInsufficientError {
    /// What was missing.
    pub reason: String,
}

/// Negative sampling parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SamplerConfig {
    /// RNG seed; the same seed and input always yield the same negatives.
    pub seed: u64,
    /// Synthetic draws per distinct positive context.
    pub negative_ratio: usize,
    /// Force each negative's city to the true city of its neighborhood.
    pub enforce_neighborhood_city: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            negative_ratio: 2,
            enforce_neighborhood_city: true,
        }
    }
}

/// Counts from one sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingSummary {
    /// Observed rows, duplicates included.
    pub observed: usize,
    /// Distinct observed contexts.
    pub positives: usize,
    /// Synthetic draws.
    pub drawn: usize,
    /// Distinct synthetic contexts.
    pub distinct_drawn: usize,
    /// Distinct synthetic contexts discarded because they were observed.
    pub collisions: usize,
    /// Surviving negatives.
    pub negatives: usize,
}

/// Positives followed by negatives, each block in context order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDataset {
    /// The labeled table.
    pub examples: Vec<LabeledContext>,
    /// How it was produced.
    pub summary: SamplingSummary,
}

impl LabeledDataset {
    /// Number of examples with `target`.
    #[must_use]
    pub fn count(&self, target: Target) -> usize {
        self.examples.iter().filter(|e| e.target == target).count()
    }
}

/// Builds the two-class table from observed contexts.
///
/// 1. Distinct observed contexts become positives.
/// 2. `negative_ratio × positives` contexts are drawn from the observed
///    domains with a seeded RNG (city taken from the neighborhood index
///    when enforced).
/// 3. Draws are deduplicated and any draw equal to a positive is removed.
/// 4. Survivors become negatives.
///
/// # Errors
///
/// Returns [`DataInsufficientError`] if there are no observed contexts or
/// no negative survives, e.g. when every dimension has a single value.
pub fn build_labeled_dataset(
    observed: &[Context],
    config: &SamplerConfig,
) -> Result<LabeledDataset, DataInsufficientError> {
    let positives: BTreeSet<Context> = observed.iter().copied().collect();
    if positives.is_empty() {
        return Err(DataInsufficientError {
            reason: "no observed contexts".to_string(),
        });
    }

    let domains = ObservedDomains::collect(observed);
    let index = config
        .enforce_neighborhood_city
        .then(|| NeighborhoodCityIndex::learn(observed));

    let draws = positives.len().saturating_mul(config.negative_ratio);
    log::info!(
        "Sampling {draws} candidate negatives for {} positives (domain size {}, seed {})",
        positives.len(),
        domains.cardinality(),
        config.seed
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut drawn = BTreeSet::new();
    for _ in 0..draws {
        if let Some(context) = domains.sample(&mut rng, index.as_ref()) {
            drawn.insert(context);
        }
    }

    let distinct_drawn = drawn.len();
    let negatives: Vec<Context> = drawn.difference(&positives).copied().collect();

    let summary = SamplingSummary {
        observed: observed.len(),
        positives: positives.len(),
        drawn: draws,
        distinct_drawn,
        collisions: distinct_drawn - negatives.len(),
        negatives: negatives.len(),
    };
    log::info!(
        "Sampled {} negatives ({} distinct draws, {} collided with observed contexts)",
        summary.negatives,
        summary.distinct_drawn,
        summary.collisions
    );

    if negatives.is_empty() {
        return Err(DataInsufficientError {
            reason: format!(
                "no negative context survived sampling ({} positives, {} distinct draws, \
                 all observed); the observed domains are too narrow",
                summary.positives, summary.distinct_drawn
            ),
        });
    }

    let examples = positives
        .into_iter()
        .map(LabeledContext::positive)
        .chain(negatives.into_iter().map(LabeledContext::negative))
        .collect();

    Ok(LabeledDataset { examples, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A small log: three neighborhoods split across two cities, a few
    /// hours and crime types.
    fn observed() -> Vec<Context> {
        let mut out = Vec::new();
        for (i, (neighborhood, city)) in [(0, 0), (1, 0), (2, 1)].into_iter().enumerate() {
            for hour in [8_u8, 14, 22] {
                for crime_type in 0..2 {
                    if (usize::from(hour) + i + crime_type as usize) % 3 == 0 {
                        continue;
                    }
                    out.push(Context {
                        day_of_week: hour % 7,
                        hour,
                        month: 10,
                        year: 2024,
                        neighborhood,
                        city,
                        crime_type,
                    });
                }
            }
        }
        out
    }

    #[test]
    fn duplicate_observations_yield_one_positive() {
        let mut contexts = observed();
        let distinct = contexts.iter().collect::<BTreeSet<_>>().len();
        contexts.extend(contexts.clone());

        let dataset = build_labeled_dataset(&contexts, &SamplerConfig::default()).unwrap();
        assert_eq!(dataset.count(Target::Occurred), distinct);
        assert_eq!(dataset.summary.positives, distinct);
        assert_eq!(dataset.summary.observed, distinct * 2);
        assert_eq!(dataset.summary.drawn, distinct * 2);
    }

    #[test]
    fn negatives_never_collide_with_positives() {
        let contexts = observed();
        for seed in 0..20 {
            let config = SamplerConfig {
                seed,
                enforce_neighborhood_city: seed % 2 == 0,
                ..SamplerConfig::default()
            };
            let dataset = build_labeled_dataset(&contexts, &config).unwrap();
            let positives: BTreeSet<Context> = dataset
                .examples
                .iter()
                .filter(|e| e.target == Target::Occurred)
                .map(|e| e.context)
                .collect();
            let negatives: Vec<Context> = dataset
                .examples
                .iter()
                .filter(|e| e.target == Target::Absent)
                .map(|e| e.context)
                .collect();

            assert!(!negatives.is_empty());
            assert!(negatives.iter().all(|n| !positives.contains(n)));
            assert_eq!(
                negatives.iter().collect::<BTreeSet<_>>().len(),
                negatives.len(),
                "negatives must be distinct"
            );
        }
    }

    #[test]
    fn enforced_negatives_use_the_true_city() {
        let contexts = observed();
        let dataset = build_labeled_dataset(&contexts, &SamplerConfig::default()).unwrap();
        let index = NeighborhoodCityIndex::learn(&contexts);

        for example in dataset.examples.iter().filter(|e| e.target == Target::Absent) {
            assert_eq!(
                Some(example.context.city),
                index.city_of(example.context.neighborhood),
                "{:?} pairs a neighborhood with the wrong city",
                example.context
            );
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        let contexts = observed();
        let a = build_labeled_dataset(&contexts, &SamplerConfig::default()).unwrap();
        let b = build_labeled_dataset(&contexts, &SamplerConfig::default()).unwrap();
        assert_eq!(a, b);

        let mut reversed = contexts;
        reversed.reverse();
        let c = build_labeled_dataset(&reversed, &SamplerConfig::default()).unwrap();
        assert_eq!(a.examples, c.examples);
    }

    #[test]
    fn positives_precede_negatives() {
        let dataset = build_labeled_dataset(&observed(), &SamplerConfig::default()).unwrap();
        let first_negative = dataset
            .examples
            .iter()
            .position(|e| e.target == Target::Absent)
            .unwrap();
        assert!(dataset.examples[..first_negative]
            .iter()
            .all(|e| e.target == Target::Occurred));
        assert!(dataset.examples[first_negative..]
            .iter()
            .all(|e| e.target == Target::Absent));
    }

    #[test]
    fn degenerate_domains_fail_fast() {
        let single = Context {
            day_of_week: 2,
            hour: 14,
            month: 10,
            year: 2024,
            neighborhood: 0,
            city: 0,
            crime_type: 0,
        };
        let err = build_labeled_dataset(&[single, single], &SamplerConfig::default()).unwrap_err();
        assert!(err.reason.contains("no negative context survived"));
    }

    #[test]
    fn empty_log_fails_fast() {
        let err = build_labeled_dataset(&[], &SamplerConfig::default()).unwrap_err();
        assert_eq!(err.reason, "no observed contexts");
    }
}
