//! Stratified train/test split.

use crime_risk_crime_models::{LabeledContext, Target};
use crime_risk_sampler::DataInsufficientError;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// A train/test partition of a labeled table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Training examples.
    pub train: Vec<LabeledContext>,
    /// Held-out examples.
    pub test: Vec<LabeledContext>,
}

/// Splits `examples` so that each class keeps its share in both halves.
///
/// Each class is shuffled with a RNG seeded from `seed` and its first
/// `round(n × test_fraction)` members (at least one, at most `n - 1`) go
/// to the test split. Classes are processed in target order so the result
/// depends only on the input order and the seed.
///
/// # Errors
///
/// Returns [`DataInsufficientError`] if either class has fewer than two
/// members.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn stratified_split(
    examples: &[LabeledContext],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, DataInsufficientError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(examples.len()),
        test: Vec::new(),
    };

    for target in [Target::Absent, Target::Occurred] {
        let mut members: Vec<LabeledContext> = examples
            .iter()
            .filter(|e| e.target == target)
            .copied()
            .collect();
        let n = members.len();
        if n < 2 {
            return Err(DataInsufficientError {
                reason: format!(
                    "class {} has {n} example(s); a stratified split needs at least 2",
                    target.value()
                ),
            });
        }

        members.shuffle(&mut rng);
        let n_test = ((n as f64) * test_fraction).round().clamp(1.0, (n - 1) as f64) as usize;
        let train = members.split_off(n_test);
        split.test.extend(members);
        split.train.extend(train);
    }

    Ok(split)
}
