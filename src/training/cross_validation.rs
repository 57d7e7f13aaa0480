//! Stratified cross-validation splitting

use crate::error::{HeartmlError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// A single train/test split over row indices.
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter that preserves class proportions in every fold.
///
/// Classes are iterated in sorted order and shuffling is seeded, so a fixed
/// seed reproduces the exact same folds across runs.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: None,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate the folds from the label vector.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(HeartmlError::Validation(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if y.len() < self.n_splits {
            return Err(HeartmlError::Validation(format!(
                "cannot split {} samples into {} folds",
                y.len(),
                self.n_splits
            )));
        }

        // Group row indices by class. BTreeMap keeps class iteration
        // order stable so the folds depend only on the seed.
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        if self.shuffle {
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal samples from each class across folds round-robin.
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[i % self.n_splits].push(idx);
            }
        }

        let mut splits = Vec::with_capacity(self.n_splits);
        for fold_idx in 0..self.n_splits {
            let test_indices = folds[fold_idx].clone();
            let train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }
}

/// Stratified train/holdout partition of row indices.
///
/// Per class, a seeded shuffle reserves `test_size` of the rows for the
/// holdout, so class proportions carry over to both partitions.
pub fn stratified_train_test_split(
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(HeartmlError::Validation(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for indices in class_indices.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64) * test_size).round() as usize;
        let n_test = n_test.clamp(1, indices.len().saturating_sub(1).max(1));
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(HeartmlError::Validation(
            "not enough samples to form both partitions".to_string(),
        ));
    }

    Ok((train, test))
}
