//! Hyperparameter selection by stratified k-fold cross-validation.
//!
//! The search is an exhaustive scan over the caller's candidate list. A later
//! candidate replaces the incumbent only with a strictly greater score, so
//! ties keep the earliest candidate.

use crate::data_handling::{stratified_k_fold, Dataset};
use crate::error::{EvalError, Result};
use crate::models::factory::ClassifierFamily;
use crate::stats::accuracy;

/// Cross-validated score of one hyperparameter candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub candidate: f64,
    pub score: f64,
}

/// Reduce an ordered sequence of scored candidates to the winner.
///
/// The incumbent starts as the first candidate with a score of 0 and is only
/// replaced by a strictly greater score.
pub fn best_candidate<I>(scores: I) -> Option<CandidateScore>
where
    I: IntoIterator<Item = CandidateScore>,
{
    let mut scores = scores.into_iter().peekable();
    let first = scores.peek()?.candidate;
    Some(scores.fold(
        CandidateScore {
            candidate: first,
            score: 0.0,
        },
        |best, next| if next.score > best.score { next } else { best },
    ))
}

/// Mean validation accuracy of `family` with hyperparameter `param` over
/// `n_splits` stratified folds of `data`.
///
/// A fresh classifier is built for every fold.
pub fn cross_val_score(
    family: ClassifierFamily,
    data: &Dataset,
    param: f64,
    n_splits: usize,
) -> Result<f64> {
    let folds = stratified_k_fold(&data.y, n_splits)?;
    let total = folds.iter().try_fold(0.0, |total, fold| -> Result<f64> {
        let train = data.select_rows(&fold.train_indices);
        let val = data.select_rows(&fold.validation_indices);

        let mut model = family.build_model(param)?;
        model.fit(&train.x, &train.y)?;
        let y_pred = model.predict(&val.x)?;
        let acc = accuracy(&val.y, &y_pred)?;
        log::trace!(
            "{} param={} fold {}: accuracy {:.4}",
            family.name(),
            param,
            fold.fold_idx,
            acc
        );
        Ok(total + acc)
    })?;
    Ok(total / n_splits as f64)
}

/// Sweep `candidates` in order and return the best cross-validated score and
/// its candidate.
pub fn select_parameters(
    data: &Dataset,
    family: ClassifierFamily,
    candidates: &[f64],
    n_splits: usize,
) -> Result<CandidateScore> {
    if candidates.is_empty() {
        return Err(EvalError::EmptyCandidates);
    }
    let scores = candidates
        .iter()
        .map(|&candidate| {
            let score = cross_val_score(family, data, candidate, n_splits)?;
            log::debug!("{} candidate {}: cv accuracy {:.4}", family.name(), candidate, score);
            Ok(CandidateScore { candidate, score })
        })
        .collect::<Result<Vec<_>>>()?;

    best_candidate(scores).ok_or(EvalError::EmptyCandidates)
}
