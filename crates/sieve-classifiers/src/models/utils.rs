use ndarray::{Array1, Array2};

use crate::data_handling::class_label;
use crate::error::{EvalError, Result};

pub(crate) fn check_rows(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(EvalError::ShapeMismatch {
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if x.nrows() == 0 {
        return Err(EvalError::ShapeMismatch { expected: 1, found: 0 });
    }
    Ok(())
}

pub(crate) fn check_columns(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(EvalError::ShapeMismatch {
            expected,
            found: x.ncols(),
        });
    }
    Ok(())
}

/// Sorted distinct class keys of `y`.
pub(crate) fn sorted_classes(y: &Array1<f64>) -> Vec<i64> {
    let mut classes: Vec<i64> = y.iter().map(|&v| class_label(v)).collect();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Most frequent label; ties resolve to the smallest label.
pub(crate) fn majority_label<I>(labels: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, c)) => *c += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(label, _)| label)
        .unwrap_or(0)
}
