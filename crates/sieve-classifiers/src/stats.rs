use ndarray::Array1;

use crate::data_handling::class_label;
use crate::error::{EvalError, Result};

/// Fraction of predictions matching the true labels.
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::ShapeMismatch {
            expected: y_true.len(),
            found: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(EvalError::ShapeMismatch { expected: 1, found: 0 });
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|&(&t, &p)| class_label(t) == class_label(p))
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Accuracy restricted to samples whose true label is `label`.
///
/// An empty subset is an error: callers must guarantee both classes are present
/// in every evaluated set.
pub fn class_accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>, label: i64) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::ShapeMismatch {
            expected: y_true.len(),
            found: y_pred.len(),
        });
    }
    let (total, correct) = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|&(&t, _)| class_label(t) == label)
        .fold((0usize, 0usize), |(total, correct), (_, &p)| {
            (total + 1, correct + (class_label(p) == label) as usize)
        });
    if total == 0 {
        return Err(EvalError::EmptyClassSubset(label));
    }
    Ok(correct as f64 / total as f64)
}

/// Overall, label-0 and label-1 accuracy of a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassAccuracies {
    pub overall: f64,
    pub class_0: f64,
    pub class_1: f64,
}

impl ClassAccuracies {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        Ok(ClassAccuracies {
            overall: accuracy(y_true, y_pred)?,
            class_0: class_accuracy(y_true, y_pred, 0)?,
            class_1: class_accuracy(y_true, y_pred, 1)?,
        })
    }
}

/// Shannon entropy (bits) of the empirical class distribution of `labels`.
pub fn entropy<'a, I>(labels: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut counts: Vec<(i64, usize)> = Vec::new();
    let mut n = 0usize;
    for &v in labels {
        let label = class_label(v);
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, c)) => *c += 1,
            None => counts.push((label, 1)),
        }
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    counts
        .iter()
        .map(|&(_, c)| {
            let p = c as f64 / n as f64;
            -p * p.log2()
        })
        .sum()
}

/// One step of the running mean: the mean of `index + 1` values given the mean
/// of the first `index` values and the next value.
#[inline]
pub fn incremental_update(avg: f64, value: f64, index: usize) -> f64 {
    let i = index as f64;
    avg * i / (i + 1.0) + value / (i + 1.0)
}

/// Running mean over an ordered sequence of values.
pub fn incremental_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .enumerate()
        .fold(0.0, |avg, (i, v)| incremental_update(avg, v, i))
}

/// Element-wise running mean over an ordered sequence of equally sized arrays.
pub fn incremental_mean_arrays<I>(values: I) -> Option<Array1<f64>>
where
    I: IntoIterator<Item = Array1<f64>>,
{
    values.into_iter().enumerate().fold(None, |acc, (i, v)| match acc {
        None => Some(v),
        Some(avg) => {
            let i = i as f64;
            Some(avg * (i / (i + 1.0)) + v / (i + 1.0))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy_and_class_accuracy() {
        let y_true = array![0.0, 0.0, 1.0, 1.0, 1.0];
        let y_pred = array![0.0, 1.0, 1.0, 1.0, 0.0];
        assert!((accuracy(&y_true, &y_pred).unwrap() - 0.6).abs() < 1e-12);
        assert!((class_accuracy(&y_true, &y_pred, 0).unwrap() - 0.5).abs() < 1e-12);
        assert!((class_accuracy(&y_true, &y_pred, 1).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_class_accuracy_on_missing_class_is_an_error() {
        let y_true = array![1.0, 1.0];
        let y_pred = array![1.0, 0.0];
        assert!(matches!(
            class_accuracy(&y_true, &y_pred, 0),
            Err(EvalError::EmptyClassSubset(0))
        ));
    }

    #[test]
    fn test_entropy_in_bits() {
        assert_eq!(entropy(&array![1.0, 1.0, 1.0]), 0.0);
        assert!((entropy(&array![0.0, 1.0, 0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(entropy(&Array1::<f64>::zeros(0)), 0.0);
    }

    #[test]
    fn test_incremental_mean_matches_arithmetic_mean() {
        let values = [0.3, 0.9, 0.1, 0.75, 0.5];
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        assert!((incremental_mean(values) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_incremental_mean_arrays() {
        let avg =
            incremental_mean_arrays(vec![array![1.0, 2.0], array![3.0, 4.0], array![5.0, 9.0]])
                .unwrap();
        assert!((avg[0] - 3.0).abs() < 1e-12);
        assert!((avg[1] - 5.0).abs() < 1e-12);
        assert!(incremental_mean_arrays(Vec::new()).is_none());
    }
}
