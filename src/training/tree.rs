//! CART decision tree for binary classification
//!
//! Leaves store the positive-class fraction of their training rows, so a
//! single tree already yields a probability and the forest can average them.

use crate::error::{HeartmlError, Result};
use crate::training::metrics::DECISION_THRESHOLD;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node: fraction of positive training rows that reached it.
    Leaf { prob: f64, n_samples: usize },
    /// Binary split on one feature at a threshold (left: value <= threshold).
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Binary classification tree with gini splits at value midpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features sampled per split; None considers all of them.
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Grow the tree. Labels must be 0 or 1.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(HeartmlError::Shape {
                expected: format!("y length = {n_samples}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(HeartmlError::Training(
                "cannot fit on an empty dataset".to_string(),
            ));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(HeartmlError::Training(
                "labels must be binary (0 or 1)".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng));
        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let n_pos = indices.iter().filter(|&&i| y[i] > 0.5).count();

        let pure = n_pos == 0 || n_pos == n_samples;
        let should_stop = pure
            || n_samples < self.min_samples_split
            || self.max_depth.is_some_and(|d| depth >= d);

        if should_stop {
            return self.leaf(n_pos, n_samples);
        }

        match self.find_best_split(x, y, indices, rng) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                if left_indices.len() < self.min_samples_leaf
                    || right_indices.len() < self.min_samples_leaf
                {
                    return self.leaf(n_pos, n_samples);
                }

                let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
                let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => self.leaf(n_pos, n_samples),
        }
    }

    fn leaf(&self, n_pos: usize, n_samples: usize) -> TreeNode {
        TreeNode::Leaf {
            prob: n_pos as f64 / n_samples.max(1) as f64,
            n_samples,
        }
    }

    /// Best (feature, threshold) by gini gain over a sampled feature subset.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let k = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let candidates: Vec<usize> = if k < n_features {
            rand::seq::index::sample(rng, n_features, k).into_vec()
        } else {
            (0..n_features).collect()
        };

        let mut best: Option<(usize, f64, f64)> = None;
        for feature_idx in candidates {
            if let Some((threshold, gain)) = self.scan_feature(x, y, indices, feature_idx) {
                match best {
                    Some((_, _, best_gain)) if gain <= best_gain => {}
                    _ => best = Some((feature_idx, threshold, gain)),
                }
            }
        }
        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    /// Single sweep over the rows sorted by one feature, evaluating the
    /// midpoint between each pair of distinct adjacent values.
    fn scan_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
    ) -> Option<(f64, f64)> {
        let total = indices.len();
        let total_pos = indices.iter().filter(|&&i| y[i] > 0.5).count();

        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[[a, feature_idx]]
                .partial_cmp(&x[[b, feature_idx]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let parent = gini(total_pos, total);
        let mut left_count = 0usize;
        let mut left_pos = 0usize;
        let mut best: Option<(f64, f64)> = None;

        for i in 0..total - 1 {
            let idx = order[i];
            left_count += 1;
            if y[idx] > 0.5 {
                left_pos += 1;
            }

            let current = x[[idx, feature_idx]];
            let next = x[[order[i + 1], feature_idx]];
            if next == current {
                continue;
            }

            let right_count = total - left_count;
            if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                continue;
            }

            let right_pos = total_pos - left_pos;
            let weighted = (left_count as f64 * gini(left_pos, left_count)
                + right_count as f64 * gini(right_pos, right_count))
                / total as f64;
            let gain = parent - weighted;

            match best {
                Some((_, best_gain)) if gain <= best_gain => {}
                _ if gain > 0.0 => best = Some(((current + next) / 2.0, gain)),
                _ => {}
            }
        }
        best
    }

    /// Positive-class probability per row (leaf fraction).
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(HeartmlError::NotFitted)?;
        if x.ncols() != self.n_features {
            return Err(HeartmlError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let proba: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let row = x.row(i).to_vec();
                Self::predict_sample(root, &row)
            })
            .collect();
        Ok(Array1::from_vec(proba))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 }))
    }

    fn predict_sample(node: &TreeNode, sample: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { prob, .. } => *prob,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

/// Gini impurity of a binary node.
fn gini(n_pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = n_pos as f64 / n as f64;
    let q = 1.0 - p;
    1.0 - p * p - q * q
}
