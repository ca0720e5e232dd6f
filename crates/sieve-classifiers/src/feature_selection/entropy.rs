//! Information gain of each feature column with respect to the label.

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{EvalError, Result};
use crate::stats::entropy;

/// Group key of a feature value. `-0.0` and `0.0` share a partition.
fn value_key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

fn conditional_entropy(column: ArrayView1<f64>, y: &Array1<f64>) -> f64 {
    let mut partitions: HashMap<u64, Vec<f64>> = HashMap::new();
    for (&value, &label) in column.iter().zip(y.iter()) {
        partitions.entry(value_key(value)).or_default().push(label);
    }
    let n = y.len() as f64;
    partitions
        .values()
        .map(|labels| entropy(labels) * labels.len() as f64 / n)
        .sum()
}

/// `H(y) - H(y | X_i)` in bits for every column `i` of `x`.
///
/// Every distinct value of a column forms its own partition, so the columns
/// are expected to be discrete or of low cardinality.
pub fn entropy_gain(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    if x.nrows() != y.len() {
        return Err(EvalError::ShapeMismatch {
            expected: x.nrows(),
            found: y.len(),
        });
    }
    let base = entropy(y);
    Ok(x.columns()
        .into_iter()
        // Rounding can leave -1e-16 on a constant column.
        .map(|column| (base - conditional_entropy(column, y)).max(0.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_separation_yields_one_bit() {
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let gain = entropy_gain(&x, &y).unwrap();
        assert_eq!(gain[0], 1.0);
    }

    #[test]
    fn test_constant_and_partial_features() {
        let x = array![[3.0, 0.0], [3.0, 0.0], [3.0, 1.0], [3.0, 1.0], [3.0, 1.0], [3.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let gain = entropy_gain(&x, &y).unwrap();
        assert!(gain[0].abs() < 1e-12);
        // Each partition holds a 2:1 split.
        let h_cond = -(2.0 / 3.0f64) * (2.0 / 3.0f64).log2()
            - (1.0 / 3.0f64) * (1.0 / 3.0f64).log2();
        assert!((gain[1] - (1.0 - h_cond)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_mismatched_rows() {
        assert!(entropy_gain(&array![[0.0], [1.0]], &array![1.0]).is_err());
    }
}
