use ndarray::{s, Array1, Array2};

use crate::error::{EvalError, Result};

/// Relative pivot size below which a column is treated as linearly dependent.
const PIVOT_EPS: f64 = 1e-10;

/// Least-squares coefficients for the normal equations `a * beta = b`.
///
/// Gauss-Jordan elimination with partial pivoting. Columns whose pivot
/// vanishes depend on earlier ones and get a zero coefficient, which leaves
/// the fitted values unchanged.
fn solve_normal_equations(mut a: Array2<f64>, mut b: Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let scale = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut rank = 0;

    for col in 0..n {
        let pivot_row = (rank..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()));
        let Some(pivot_row) = pivot_row else {
            break;
        };
        if a[[pivot_row, col]].abs() <= PIVOT_EPS * scale {
            continue;
        }
        if pivot_row != rank {
            for k in 0..n {
                a.swap([pivot_row, k], [rank, k]);
            }
            b.swap(pivot_row, rank);
        }
        let pivot = a[[rank, col]];
        for row in 0..n {
            if row == rank {
                continue;
            }
            let factor = a[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[rank, k]];
            }
            b[row] -= factor * b[rank];
        }
        pivots.push((rank, col));
        rank += 1;
    }

    let mut beta = Array1::zeros(n);
    for (row, col) in pivots {
        beta[col] = b[row] / a[[row, col]];
    }
    beta
}

/// Coefficient of determination of an ordinary least-squares fit (with
/// intercept) of `y` on all columns of `x`, evaluated on the training data.
pub fn multivariate_r2(x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
    if x.nrows() != y.len() {
        return Err(EvalError::ShapeMismatch {
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if y.is_empty() {
        return Err(EvalError::ShapeMismatch { expected: 1, found: 0 });
    }

    let mut design = Array2::ones((x.nrows(), x.ncols() + 1));
    design.slice_mut(s![.., 1..]).assign(x);

    let gram = design.t().dot(&design);
    let rhs = design.t().dot(y);
    let beta = solve_normal_equations(gram, rhs);

    let fitted = design.dot(&beta);
    let y_mean = y.mean().unwrap_or(0.0);
    let ss_res: f64 = y.iter().zip(fitted.iter()).map(|(t, f)| (t - f).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|t| (t - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        // Constant target: perfect when reproduced exactly, undefined otherwise.
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}
