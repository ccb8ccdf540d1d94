//! Binary classification metrics on a held-out split.

use std::cmp::Ordering;

/// Decision threshold for turning probabilities into labels.
pub const THRESHOLD: f64 = 0.5;

/// Binary confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Positives predicted positive.
    pub true_positives: usize,
    /// Negatives predicted positive.
    pub false_positives: usize,
    /// Negatives predicted negative.
    pub true_negatives: usize,
    /// Positives predicted negative.
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Tallies `labels` against `probabilities` thresholded at
    /// [`THRESHOLD`].
    #[must_use]
    pub fn from_probabilities(labels: &[bool], probabilities: &[f64]) -> Self {
        let mut matrix = Self::default();
        for (&actual, &p) in labels.iter().zip(probabilities) {
            match (actual, p >= THRESHOLD) {
                (true, true) => matrix.true_positives += 1,
                (false, true) => matrix.false_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (true, false) => matrix.false_negatives += 1,
            }
        }
        matrix
    }

    /// Number of tallied samples.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Correct predictions over all predictions; 0.0 when empty.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// `TP / (TP + FP)`; 0.0 when nothing was predicted positive.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    /// `TP / (TP + FN)`; 0.0 when there are no positives.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// Harmonic mean of precision and recall; 0.0 when both are 0.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Area under the ROC curve.
///
/// Walks thresholds from the highest score down, grouping tied scores into
/// one step, and integrates with the trapezoidal rule. Returns `None` when
/// `labels` lacks either class (the curve is undefined) or the lengths
/// differ.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });

    let p = positives as f64;
    let n = negatives as f64;
    let (mut tp, mut fp) = (0_usize, 0_usize);
    let (mut prev_tpr, mut prev_fpr) = (0.0, 0.0);
    let mut auc = 0.0;

    let mut i = 0;
    while i < order.len() {
        let score = scores[order[i]];
        while i < order.len() && scores[order[i]].total_cmp(&score) == Ordering::Equal {
            if labels[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let tpr = tp as f64 / p;
        let fpr = fp as f64 / n;
        auc += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }

    Some(auc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn confusion_matrix_metrics_match_hand_computation() {
        // TP=2, FP=1, TN=3, FN=2
        let labels = [true, true, false, false, false, false, true, true];
        let probs = [0.9, 0.6, 0.7, 0.1, 0.2, 0.4, 0.3, 0.49];
        let m = ConfusionMatrix::from_probabilities(&labels, &probs);

        assert_eq!(
            m,
            ConfusionMatrix {
                true_positives: 2,
                false_positives: 1,
                true_negatives: 3,
                false_negatives: 2,
            }
        );
        assert!(close(m.accuracy(), 5.0 / 8.0));
        assert!(close(m.precision(), 2.0 / 3.0));
        assert!(close(m.recall(), 0.5));
        assert!(close(m.f1(), 4.0 / 7.0));
    }

    #[test]
    fn threshold_is_inclusive() {
        let m = ConfusionMatrix::from_probabilities(&[true], &[0.5]);
        assert_eq!(m.true_positives, 1);
    }

    #[test]
    fn empty_matrix_is_all_zero() {
        let m = ConfusionMatrix::default();
        assert!(close(m.accuracy(), 0.0));
        assert!(close(m.precision(), 0.0));
        assert!(close(m.f1(), 0.0));
    }

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let labels = [false, false, true, true];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert!(close(roc_auc(&labels, &scores).unwrap(), 1.0));
    }

    #[test]
    fn inverted_ranking_has_zero_auc() {
        let labels = [true, true, false, false];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert!(close(roc_auc(&labels, &scores).unwrap(), 0.0));
    }

    #[test]
    fn partial_ranking_matches_pair_count() {
        // Positive scores 0.8, 0.4; negative scores 0.6, 0.2.
        // Concordant pairs: (0.8,0.6) (0.8,0.2) (0.4,0.2) = 3 of 4.
        let labels = [true, false, true, false];
        let scores = [0.8, 0.6, 0.4, 0.2];
        assert!(close(roc_auc(&labels, &scores).unwrap(), 0.75));
    }

    #[test]
    fn ties_count_half() {
        let labels = [true, false];
        let scores = [0.5, 0.5];
        assert!(close(roc_auc(&labels, &scores).unwrap(), 0.5));
    }

    #[test]
    fn single_class_has_no_auc() {
        assert_eq!(roc_auc(&[true, true], &[0.2, 0.9]), None);
        assert_eq!(roc_auc(&[], &[]), None);
    }
}
