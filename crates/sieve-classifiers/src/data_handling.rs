//! Data structures and helpers for preparing a feature matrix for evaluation.
//!
//! This module defines `Dataset` and contains helpers for binarizing labels,
//! building deterministic permutations, and creating the train/test splits and
//! stratified folds used by the selection and evaluation routines.
use std::collections::HashMap;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{EvalError, Result};

/// Class key of a (binarized) label value.
#[inline]
pub fn class_label(value: f64) -> i64 {
    value.round() as i64
}

/// Map a continuous label onto {0, 1}: `1` above `threshold`, `0` otherwise.
pub fn binarize_labels(y: &Array1<f64>, threshold: f64) -> Array1<f64> {
    y.mapv(|v| if v > threshold { 1.0 } else { 0.0 })
}

/// Deterministic permutation of `0..n` for the given seed.
pub fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Optional sample identities, carried along but never used for scoring.
    pub sample_ids: Option<Vec<String>>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array1<f64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(EvalError::ShapeMismatch {
                expected: x.nrows(),
                found: y.len(),
            });
        }
        Ok(Dataset {
            x,
            y,
            sample_ids: None,
        })
    }

    pub fn with_sample_ids(mut self, ids: Vec<String>) -> Result<Self> {
        if ids.len() != self.n_samples() {
            return Err(EvalError::ShapeMismatch {
                expected: self.n_samples(),
                found: ids.len(),
            });
        }
        self.sample_ids = Some(ids);
        Ok(self)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn log_input_data_summary(&self) {
        let positives = self.y.iter().filter(|&&v| class_label(v) == 1).count();
        log::info!("----- Input Data Summary -----");
        log::info!(
            "{} samples ({} with label 1, {} with label 0)",
            self.n_samples(),
            positives,
            self.n_samples() - positives
        );
        log::info!("{} feature columns", self.n_features());
        log::info!("-------------------------------");
    }

    /// Binarize the labels in place. Must run once, before any splitting.
    pub fn binarize(&mut self, threshold: f64) {
        self.y = binarize_labels(&self.y, threshold);
    }

    /// Rows selected by `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            sample_ids: self
                .sample_ids
                .as_ref()
                .map(|ids| indices.iter().map(|&i| ids[i].clone()).collect()),
        }
    }

    /// A copy of the dataset with rows permuted by the seeded permutation.
    pub fn permuted(&self, seed: u64) -> Dataset {
        self.select_rows(&permutation(self.n_samples(), seed))
    }

    /// Single-column view of feature `col` as an `(n, 1)` dataset.
    pub fn single_feature(&self, col: usize) -> Dataset {
        Dataset {
            x: self.x.select(Axis(1), &[col]),
            y: self.y.clone(),
            sample_ids: None,
        }
    }

    /// Materialize the train and test halves of a split.
    pub fn split(&self, split: &Split) -> (Dataset, Dataset) {
        (self.select_rows(&split.train), self.select_rows(&split.test))
    }
}

/// A train/test partition of sample indices.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle split holding out `ceil(test_fraction * n)` samples.
///
/// With `stratify`, each class contributes `round(test_fraction * n_class)`
/// samples to the test side (at least one, leaving at least one for training).
pub fn train_test_split(
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
    stratify: bool,
) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(EvalError::InvalidConfig(format!(
            "test fraction must lie in (0, 1), got {}",
            test_fraction
        )));
    }
    let n = y.len();
    let order = permutation(n, seed);

    let mut in_test = vec![false; n];
    if stratify {
        let mut class_counts: HashMap<i64, usize> = HashMap::new();
        for &v in y.iter() {
            *class_counts.entry(class_label(v)).or_default() += 1;
        }
        let mut quota: HashMap<i64, usize> = class_counts
            .iter()
            .map(|(&label, &count)| {
                let wanted = (test_fraction * count as f64).round() as usize;
                let wanted = if count >= 2 { wanted.clamp(1, count - 1) } else { 0 };
                (label, wanted)
            })
            .collect();
        for &idx in &order {
            if let Some(left) = quota.get_mut(&class_label(y[idx])) {
                if *left > 0 {
                    *left -= 1;
                    in_test[idx] = true;
                }
            }
        }
    } else {
        let n_test = ((test_fraction * n as f64).ceil() as usize).min(n.saturating_sub(1));
        for &idx in order.iter().take(n_test) {
            in_test[idx] = true;
        }
    }

    let (test, train): (Vec<usize>, Vec<usize>) = order.into_iter().partition(|&i| in_test[i]);
    Ok(Split { train, test })
}

/// One fold of a k-fold partition.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub validation_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold partition without shuffling.
///
/// Classes are encoded in order of first appearance; the sorted label sequence
/// is dealt round-robin over the folds to obtain per-fold class counts, and each
/// class then fills folds `0..k` with contiguous runs of its samples in their
/// original order. Every class must have at least `n_splits` members.
pub fn stratified_k_fold(y: &Array1<f64>, n_splits: usize) -> Result<Vec<Fold>> {
    if n_splits < 2 {
        return Err(EvalError::InvalidConfig(format!(
            "n_splits must be at least 2, got {}",
            n_splits
        )));
    }
    if y.len() < n_splits {
        return Err(EvalError::ShapeMismatch {
            expected: n_splits,
            found: y.len(),
        });
    }

    // Encode classes in order of first appearance.
    let mut classes: Vec<i64> = Vec::new();
    let encoded: Vec<usize> = y
        .iter()
        .map(|&v| {
            let label = class_label(v);
            match classes.iter().position(|&c| c == label) {
                Some(pos) => pos,
                None => {
                    classes.push(label);
                    classes.len() - 1
                }
            }
        })
        .collect();

    let mut counts = vec![0usize; classes.len()];
    for &k in &encoded {
        counts[k] += 1;
    }
    if let Some((k, &count)) = counts.iter().enumerate().find(|&(_, &c)| c < n_splits) {
        return Err(EvalError::DegenerateFold {
            label: classes[k],
            count,
            n_splits,
        });
    }

    let mut sorted = encoded.clone();
    sorted.sort_unstable();
    // allocation[fold][class]
    let mut allocation = vec![vec![0usize; classes.len()]; n_splits];
    for (i, &k) in sorted.iter().enumerate() {
        allocation[i % n_splits][k] += 1;
    }

    let mut test_fold = vec![0usize; y.len()];
    for k in 0..classes.len() {
        let folds_for_class =
            (0..n_splits).flat_map(|f| std::iter::repeat(f).take(allocation[f][k]));
        let members = encoded.iter().enumerate().filter(|&(_, &c)| c == k).map(|(i, _)| i);
        for (idx, fold) in members.zip(folds_for_class) {
            test_fold[idx] = fold;
        }
    }

    Ok((0..n_splits)
        .map(|fold_idx| {
            let (validation_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| test_fold[i] == fold_idx);
            Fold {
                train_indices,
                validation_indices,
                fold_idx,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binarize_labels() {
        let y = array![0.0, 3.0, 1.0, 0.5, 7.0];
        assert_eq!(binarize_labels(&y, 0.0), array![0.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(binarize_labels(&y, 1.0), array![0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_permutation_is_deterministic() {
        assert_eq!(permutation(50, 3), permutation(50, 3));
        assert_ne!(permutation(50, 3), permutation(50, 4));
        let mut p = permutation(50, 3);
        p.sort_unstable();
        assert_eq!(p, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_k_fold_covers_every_sample_once() {
        let y = Array1::from_vec((0..23).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect());
        let folds = stratified_k_fold(&y, 5).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen: Vec<usize> =
            folds.iter().flat_map(|f| f.validation_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train_indices.len() + fold.validation_indices.len(), 23);
            assert!(fold
                .validation_indices
                .iter()
                .all(|i| !fold.train_indices.contains(i)));
        }
    }

    #[test]
    fn test_stratified_k_fold_rejects_small_class() {
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        match stratified_k_fold(&y, 3) {
            Err(EvalError::DegenerateFold { label, count, .. }) => {
                assert_eq!(label, 1);
                assert_eq!(count, 2);
            }
            other => panic!("expected DegenerateFold, got {:?}", other),
        }
    }

    #[test]
    fn test_train_test_split_sizes() {
        let y = Array1::from_vec((0..20).map(|i| (i % 2) as f64).collect());
        let split = train_test_split(&y, 0.2, 0, false).unwrap();
        assert_eq!(split.test.len(), 4);
        assert_eq!(split.train.len(), 16);

        let split = train_test_split(&y, 0.2, 0, true).unwrap();
        let test_pos = split.test.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(test_pos, 2);
        assert_eq!(split.test.len(), 4);
    }

    #[test]
    fn test_dataset_rejects_mismatched_rows() {
        let x = Array2::<f64>::zeros((3, 2));
        let y = array![0.0, 1.0];
        assert!(Dataset::new(x, y).is_err());
    }
}
