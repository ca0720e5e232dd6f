//! Cross-validation and held-out evaluation wrappers around [`train`].

use candle_core::Device;
use ndarray::Array1;
use rayon::prelude::*;

use crate::config::{EvaluationConfig, LearningRatePolicy, SingleFeatureSelection};
use crate::data_handling::{stratified_k_fold, train_test_split, Dataset};
use crate::error::{EvalError, Result};
use crate::network::model::FeedForwardNet;
use crate::network::trainer::{prediction_accuracy, to_tensors, train, TrainingOptions};
use crate::selection::{best_candidate, CandidateScore};
use crate::stats::ClassAccuracies;

/// Share of the training split held out to pick the final checkpoint.
pub const FULL_VALIDATION_FRACTION: f64 = 0.1;
pub const SINGLE_FEATURE_VALIDATION_FRACTION: f64 = 0.2;
/// Seed of the validation hold-out and of the final retrain.
const FINAL_RETRAIN_SEED: u64 = 0;

/// Settings shared by the network evaluation procedures.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSettings {
    pub epochs: usize,
    pub n_splits: usize,
    pub learning_rate_policy: LearningRatePolicy,
    pub single_feature_selection: SingleFeatureSelection,
}

impl NetworkSettings {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            epochs: config.epochs,
            n_splits: config.num_splits,
            learning_rate_policy: config.learning_rate_policy,
            single_feature_selection: config.single_feature_selection,
        }
    }

    fn training_options(&self, learning_rate: f64, seed: u64) -> TrainingOptions {
        TrainingOptions {
            epochs: self.epochs,
            learning_rate,
            learning_rate_policy: self.learning_rate_policy,
            seed,
        }
    }
}

/// Outcome of one full-feature network evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkReport {
    pub accuracies: ClassAccuracies,
    /// Chosen learning rate and its cross-validated score.
    pub selected: CandidateScore,
    /// Validation accuracy of the checkpoint used on the test split.
    pub validation_accuracy: f64,
    pub best_epoch: usize,
}

/// Mean best-epoch validation accuracy over stratified folds of `data`.
///
/// Fold `i` trains with seed `i`.
pub fn cross_validate_network(
    data: &Dataset,
    learning_rate: f64,
    settings: &NetworkSettings,
) -> Result<f64> {
    let folds = stratified_k_fold(&data.y, settings.n_splits)?;
    let total = folds.iter().try_fold(0.0, |total, fold| -> Result<f64> {
        let train_fold = data.select_rows(&fold.train_indices);
        let val_fold = data.select_rows(&fold.validation_indices);
        let trained = train(
            &train_fold,
            &val_fold,
            &settings.training_options(learning_rate, fold.fold_idx as u64),
        )?;
        log::trace!(
            "net lr={} fold {}: best epoch {} accuracy {:.4}",
            learning_rate,
            fold.fold_idx,
            trained.best_epoch,
            trained.accuracy
        );
        Ok(total + trained.accuracy)
    })?;
    Ok(total / settings.n_splits as f64)
}

fn sweep_learning_rates(
    data: &Dataset,
    candidates: &[f64],
    settings: &NetworkSettings,
) -> Result<Vec<CandidateScore>> {
    if candidates.is_empty() {
        return Err(EvalError::EmptyCandidates);
    }
    candidates
        .iter()
        .map(|&candidate| {
            let score = cross_validate_network(data, candidate, settings)?;
            log::debug!("net candidate {}: cv accuracy {:.4}", candidate, score);
            Ok(CandidateScore { candidate, score })
        })
        .collect()
}

/// Retrain on `train` minus a seeded hold-out and return the best checkpoint
/// as an inference network.
fn retrain_with_holdout(
    train_data: &Dataset,
    learning_rate: f64,
    validation_fraction: f64,
    settings: &NetworkSettings,
) -> Result<(FeedForwardNet, f64, usize)> {
    let split = train_test_split(&train_data.y, validation_fraction, FINAL_RETRAIN_SEED, false)?;
    let (training, validation) = train_data.split(&split);
    let trained = train(
        &training,
        &validation,
        &settings.training_options(learning_rate, FINAL_RETRAIN_SEED),
    )?;
    let net = FeedForwardNet::from_snapshot(&trained.snapshot, &Device::Cpu)?;
    Ok((net, trained.accuracy, trained.best_epoch))
}

/// Select a learning rate by cross-validation on `train`, retrain with a 10%
/// validation hold-out, and score the best checkpoint on `test`.
pub fn evaluate_network(
    train_data: &Dataset,
    test: &Dataset,
    candidates: &[f64],
    settings: &NetworkSettings,
) -> Result<NetworkReport> {
    let scores = sweep_learning_rates(train_data, candidates, settings)?;
    let selected = best_candidate(scores).ok_or(EvalError::EmptyCandidates)?;

    let (net, validation_accuracy, best_epoch) =
        retrain_with_holdout(train_data, selected.candidate, FULL_VALIDATION_FRACTION, settings)?;

    let (x_test, _) = to_tensors(test, &Device::Cpu)?;
    let y_pred = Array1::from_vec(net.predict(&x_test)?.into_iter().map(f64::from).collect());

    Ok(NetworkReport {
        accuracies: ClassAccuracies::compute(&test.y, &y_pred)?,
        selected,
        validation_accuracy,
        best_epoch,
    })
}

/// Pick the per-feature learning rate according to `policy`.
fn choose_single_feature_candidate(
    scores: Vec<CandidateScore>,
    policy: SingleFeatureSelection,
) -> Option<CandidateScore> {
    match policy {
        SingleFeatureSelection::LastCandidate => scores.last().copied(),
        SingleFeatureSelection::BestScore => best_candidate(scores),
    }
}

/// Test accuracy of a network trained on each feature column on its own.
///
/// With [`SingleFeatureSelection::LastCandidate`] the last learning rate is
/// used for every column whatever its cross-validated score.
pub fn evaluate_network_single_feature(
    train_data: &Dataset,
    test: &Dataset,
    candidates: &[f64],
    settings: &NetworkSettings,
) -> Result<Array1<f64>> {
    let accuracies = (0..train_data.n_features())
        .into_par_iter()
        .map(|col| {
            let train_col = train_data.single_feature(col);
            let test_col = test.single_feature(col);

            let scores = sweep_learning_rates(&train_col, candidates, settings)?;
            let chosen = choose_single_feature_candidate(scores, settings.single_feature_selection)
                .ok_or(EvalError::EmptyCandidates)?;

            let (net, _, _) = retrain_with_holdout(
                &train_col,
                chosen.candidate,
                SINGLE_FEATURE_VALIDATION_FRACTION,
                settings,
            )?;
            let (x_test, y_test) = to_tensors(&test_col, &Device::Cpu)?;
            let acc = prediction_accuracy(&net.predict(&x_test)?, &y_test)?;
            log::trace!("net feature {}: lr {} test accuracy {:.4}", col, chosen.candidate, acc);
            Ok(acc)
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(Array1::from_vec(accuracies))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> Vec<CandidateScore> {
        vec![
            CandidateScore { candidate: 0.1, score: 0.9 },
            CandidateScore { candidate: 0.01, score: 0.6 },
            CandidateScore { candidate: 0.001, score: 0.7 },
        ]
    }

    #[test]
    fn test_legacy_selection_picks_last_candidate() {
        let chosen =
            choose_single_feature_candidate(scores(), SingleFeatureSelection::LastCandidate)
                .unwrap();
        assert_eq!(chosen.candidate, 0.001);
    }

    #[test]
    fn test_best_score_selection() {
        let chosen =
            choose_single_feature_candidate(scores(), SingleFeatureSelection::BestScore).unwrap();
        assert_eq!(chosen.candidate, 0.1);
        let none = choose_single_feature_candidate(Vec::new(), SingleFeatureSelection::BestScore);
        assert!(none.is_none());
    }
}
