//! Univariate least-squares scoring of feature columns.
//!
//! Each column is regressed against the label on its own. The slope test uses
//! the F statistic with (1, n - 2) degrees of freedom, which is the square of
//! the two-sided Student-t test on the slope.

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::error::{EvalError, Result};

/// Per-column R² and slope p-values.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionScores {
    pub r2: Array1<f64>,
    pub p_values: Array1<f64>,
}

/// Pearson correlation of every column of `x` with `y`.
///
/// Columns or labels without variance have an undefined correlation, which is
/// reported as 0.
pub fn r_regression(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    if x.nrows() != y.len() {
        return Err(EvalError::ShapeMismatch {
            expected: x.nrows(),
            found: y.len(),
        });
    }
    let y_mean = y.mean().unwrap_or(0.0);
    let y_centered = y.mapv(|v| v - y_mean);
    let y_norm = y_centered.dot(&y_centered).sqrt();

    let x_means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
    Ok(x.columns()
        .into_iter()
        .zip(x_means.iter())
        .map(|(col, &mean)| {
            let centered = col.mapv(|v| v - mean);
            let x_norm = centered.dot(&centered).sqrt();
            let r = centered.dot(&y_centered) / (x_norm * y_norm);
            if r.is_finite() {
                r.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        })
        .collect())
}

/// R² and two-sided slope p-value of a simple OLS fit of `y` on each column.
///
/// A perfect fit gets a p-value of 0; a column with no variance gets R² = 0
/// and a p-value of 1.
pub fn univariate_regression(x: &Array2<f64>, y: &Array1<f64>) -> Result<RegressionScores> {
    if y.len() < 3 {
        return Err(EvalError::InvalidConfig(format!(
            "univariate regression needs at least 3 samples, got {}",
            y.len()
        )));
    }
    let r = r_regression(x, y)?;
    let dof = y.len() as f64 - 2.0;
    let f_dist = FisherSnedecor::new(1.0, dof)
        .map_err(|e| EvalError::InvalidConfig(format!("F distribution: {}", e)))?;

    let r2 = r.mapv(|v| v * v);
    let p_values = r2.mapv(|r2| {
        if r2 >= 1.0 {
            return 0.0;
        }
        let f = r2 / (1.0 - r2) * dof;
        f_dist.sf(f)
    });

    Ok(RegressionScores { r2, p_values })
}

/// Indices and p-values of features with `p <= alpha / n_features`, in column
/// order.
pub fn significant_features(p_values: &Array1<f64>, alpha: f64) -> Vec<(usize, f64)> {
    if p_values.is_empty() {
        return Vec::new();
    }
    let threshold = alpha / p_values.len() as f64;
    p_values
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p <= threshold)
        .map(|(i, &p)| (i, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_univariate_regression_scores() {
        // Features: [collinear with target, constant, alternating noise]
        let x = Array2::from_shape_vec(
            (8, 3),
            vec![
                0.0, 5.0, 1.0, //
                1.0, 5.0, -1.0, //
                2.0, 5.0, 1.0, //
                3.0, 5.0, -1.0, //
                4.0, 5.0, 1.0, //
                5.0, 5.0, -1.0, //
                6.0, 5.0, 1.0, //
                7.0, 5.0, -1.0,
            ],
        )
        .unwrap();
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0];

        let scores = univariate_regression(&x, &y).unwrap();
        assert!((scores.r2[0] - 1.0).abs() < 1e-12);
        assert!(scores.p_values[0] < 1e-10);
        assert_eq!(scores.r2[1], 0.0);
        assert!((scores.p_values[1] - 1.0).abs() < 1e-12);
        assert!(scores.r2[2] < 0.2);
        assert!(scores.p_values[2] > 0.05);
    }

    #[test]
    fn test_p_value_matches_two_sided_t_test() {
        use statrs::distribution::StudentsT;

        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![2.0, 1.0, 4.0, 3.0, 6.0, 1.0];
        let r = r_regression(&x, &y).unwrap()[0];
        let scores = univariate_regression(&x, &y).unwrap();
        assert!((scores.r2[0] - r * r).abs() < 1e-12);

        let dof = 4.0;
        let t = r * (dof / (1.0 - r * r)).sqrt();
        let expected = 2.0 * StudentsT::new(0.0, 1.0, dof).unwrap().sf(t.abs());
        assert!((scores.p_values[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_significant_features_uses_bonferroni() {
        let p = array![0.001, 0.02, 0.0125, 0.5];
        // threshold = 0.05 / 4 = 0.0125, compared inclusively
        assert_eq!(significant_features(&p, 0.05), vec![(0, 0.001), (2, 0.0125)]);
        assert!(significant_features(&Array1::zeros(0), 0.05).is_empty());
    }
}
