//! Held-out test evaluation of a classifier family.
//!
//! Hyperparameters are chosen by cross-validation on the training split only;
//! the test split is touched exactly once, by the refitted winner.

use ndarray::Array1;
use rayon::prelude::*;

use crate::data_handling::Dataset;
use crate::error::Result;
use crate::models::factory::ClassifierFamily;
use crate::selection::{select_parameters, CandidateScore};
use crate::stats::{accuracy, ClassAccuracies};

/// Outcome of one full-feature evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    pub accuracies: ClassAccuracies,
    /// Winning candidate and its cross-validated training score.
    pub selected: CandidateScore,
}

/// Select a hyperparameter on `train`, refit on all of `train` and score the
/// refitted model on `test`.
pub fn evaluate(
    train: &Dataset,
    test: &Dataset,
    family: ClassifierFamily,
    candidates: &[f64],
    n_splits: usize,
) -> Result<EvaluationReport> {
    let selected = select_parameters(train, family, candidates, n_splits)?;
    log::debug!(
        "{}: selected candidate {} (cv accuracy {:.4})",
        family.name(),
        selected.candidate,
        selected.score
    );

    let mut model = family.build_model(selected.candidate)?;
    model.fit(&train.x, &train.y)?;
    let y_pred = model.predict(&test.x)?;

    Ok(EvaluationReport {
        accuracies: ClassAccuracies::compute(&test.y, &y_pred)?,
        selected,
    })
}

/// Test accuracy of `family` trained on each feature column on its own.
///
/// Every column runs its own selection and refit; the output follows the
/// input column order.
pub fn evaluate_single_feature(
    train: &Dataset,
    test: &Dataset,
    family: ClassifierFamily,
    candidates: &[f64],
    n_splits: usize,
) -> Result<Array1<f64>> {
    let accuracies = (0..train.n_features())
        .into_par_iter()
        .map(|col| {
            let train_col = train.single_feature(col);
            let test_col = test.single_feature(col);

            let selected = select_parameters(&train_col, family, candidates, n_splits)?;
            let mut model = family.build_model(selected.candidate)?;
            model.fit(&train_col.x, &train_col.y)?;
            let y_pred = model.predict(&test_col.x)?;
            let acc = accuracy(&test_col.y, &y_pred)?;
            log::trace!("{} feature {}: test accuracy {:.4}", family.name(), col, acc);
            Ok(acc)
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(Array1::from_vec(accuracies))
}
