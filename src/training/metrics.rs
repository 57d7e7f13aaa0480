//! Classification metrics
//!
//! The four metrics the pipeline reports for every candidate, on both the
//! cross-validation folds and the holdout split.

use crate::error::{HeartmlError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Probability at or above which a prediction counts as positive.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Accuracy, precision, recall and ROC-AUC for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub roc_auc: f64,
}

impl ClassificationMetrics {
    /// Compute all four metrics from true labels and predicted positive-class
    /// probabilities. Labels are thresholded at [`DECISION_THRESHOLD`].
    ///
    /// Precision and recall fall back to 0.0 when their denominator is zero.
    pub fn compute(y_true: &Array1<f64>, proba: &Array1<f64>) -> Result<Self> {
        if y_true.len() != proba.len() {
            return Err(HeartmlError::Shape {
                expected: format!("{} probabilities", y_true.len()),
                actual: format!("{}", proba.len()),
            });
        }
        if y_true.is_empty() {
            return Err(HeartmlError::Data(
                "cannot compute metrics on empty arrays".to_string(),
            ));
        }

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut tn = 0usize;
        let mut fn_ = 0usize;

        for (&truth, &p) in y_true.iter().zip(proba.iter()) {
            let pred = p >= DECISION_THRESHOLD;
            let actual = truth > 0.5;
            match (pred, actual) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
        }

        let n = y_true.len() as f64;
        let accuracy = (tp + tn) as f64 / n;
        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let roc_auc = roc_auc_score(y_true, proba)?;

        Ok(Self {
            accuracy,
            precision,
            recall,
            roc_auc,
        })
    }

    /// Element-wise mean across fold metrics.
    pub fn mean_of(all: &[ClassificationMetrics]) -> ClassificationMetrics {
        let n = all.len().max(1) as f64;
        ClassificationMetrics {
            accuracy: all.iter().map(|m| m.accuracy).sum::<f64>() / n,
            precision: all.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: all.iter().map(|m| m.recall).sum::<f64>() / n,
            roc_auc: all.iter().map(|m| m.roc_auc).sum::<f64>() / n,
        }
    }

    /// Metric name to value, in stable key order.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("accuracy".to_string(), self.accuracy),
            ("precision".to_string(), self.precision),
            ("recall".to_string(), self.recall),
            ("roc_auc".to_string(), self.roc_auc),
        ])
    }
}

/// Area under the ROC curve via the rank statistic, with average ranks for
/// tied scores. Returns 0.5 (chance level) when only one class is present,
/// so degenerate folds stay comparable instead of erroring.
pub fn roc_auc_score(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    if y_true.len() != scores.len() {
        return Err(HeartmlError::Shape {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{}", scores.len()),
        });
    }

    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(0.5);
    }

    // Sort sample indices by score, then assign average ranks to ties.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the mean rank of their block.
        let avg_rank = (i + 1 + j + 1) as f64 / 2.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&truth, _)| truth > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let auc = (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64;
    Ok(auc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_separation_gives_auc_one() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let scores = array![0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc_score(&y, &scores).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_scores_give_auc_zero() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let scores = array![0.9, 0.8, 0.2, 0.1];
        assert!(roc_auc_score(&y, &scores).unwrap().abs() < 1e-12);
    }

    #[test]
    fn tied_scores_use_average_ranks() {
        let y = array![0.0, 1.0];
        let scores = array![0.5, 0.5];
        assert!((roc_auc_score(&y, &scores).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_class_returns_chance() {
        let y = array![1.0, 1.0, 1.0];
        let scores = array![0.2, 0.5, 0.9];
        assert_eq!(roc_auc_score(&y, &scores).unwrap(), 0.5);
    }

    #[test]
    fn metrics_on_perfect_predictions() {
        let y = array![1.0, 0.0, 1.0, 0.0];
        let proba = array![0.9, 0.1, 0.8, 0.2];
        let m = ClassificationMetrics::compute(&y, &proba).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.roc_auc, 1.0);
    }

    #[test]
    fn no_positive_predictions_zeroes_precision() {
        let y = array![1.0, 1.0, 0.0];
        let proba = array![0.1, 0.2, 0.3];
        let m = ClassificationMetrics::compute(&y, &proba).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
    }

    #[test]
    fn threshold_is_inclusive_at_half() {
        let y = array![1.0, 0.0];
        let proba = array![0.5, 0.4999];
        let m = ClassificationMetrics::compute(&y, &proba).unwrap();
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn mean_of_averages_each_field() {
        let a = ClassificationMetrics {
            accuracy: 1.0,
            precision: 0.5,
            recall: 0.0,
            roc_auc: 1.0,
        };
        let b = ClassificationMetrics {
            accuracy: 0.0,
            precision: 0.5,
            recall: 1.0,
            roc_auc: 0.0,
        };
        let mean = ClassificationMetrics::mean_of(&[a, b]);
        assert_eq!(mean.accuracy, 0.5);
        assert_eq!(mean.precision, 0.5);
        assert_eq!(mean.recall, 0.5);
        assert_eq!(mean.roc_auc, 0.5);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let y = array![1.0, 0.0];
        let proba = array![0.5];
        assert!(ClassificationMetrics::compute(&y, &proba).is_err());
    }

    #[test]
    fn metric_map_has_stable_keys() {
        let m = ClassificationMetrics {
            accuracy: 0.9,
            precision: 0.8,
            recall: 0.7,
            roc_auc: 0.95,
        };
        let map = m.to_map();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["accuracy", "precision", "recall", "roc_auc"]);
    }
}
