//! Repeated shuffle evaluation.
//!
//! Shuffle `i` permutes the binarized dataset with seed `i` and runs the
//! configured procedure on it. Shuffles run in parallel; their results are
//! collected in shuffle order and combined with the incremental mean, so the
//! summary does not depend on scheduling.

use ndarray::Array1;
use rayon::prelude::*;

use crate::config::{EvaluationConfig, LearningRatePolicy, ModelType, SingleFeatureSelection};
use crate::data_handling::{train_test_split, Dataset};
use crate::error::{EvalError, Result};
use crate::feature_selection::{
    entropy_gain, multivariate_r2, significant_features, univariate_regression,
};
use crate::models::factory::ClassifierFamily;
use crate::network::{evaluate_network, evaluate_network_single_feature, NetworkSettings};
use crate::pipeline::{evaluate, evaluate_single_feature};
use crate::stats::{incremental_mean, incremental_mean_arrays, ClassAccuracies};

/// Seed of the train/test split inside every shuffle. Variation across
/// shuffles comes from the permutation.
const SPLIT_SEED: u64 = 0;

/// The analysis run on every shuffle. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    EntropyGain,
    Regression { per_feature: bool },
    Classifier { family: ClassifierFamily, per_feature: bool },
    Network { per_feature: bool },
}

impl Procedure {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        let per_feature = config.per_feature;
        match config.model_type {
            ModelType::Entropy => Procedure::EntropyGain,
            ModelType::LinReg => Procedure::Regression { per_feature },
            ModelType::Net => Procedure::Network { per_feature },
            ModelType::Svm => Procedure::Classifier {
                family: ClassifierFamily::Svm,
                per_feature,
            },
            ModelType::Knn => Procedure::Classifier {
                family: ClassifierFamily::Knn,
                per_feature,
            },
            ModelType::Tree => Procedure::Classifier {
                family: ClassifierFamily::Tree,
                per_feature,
            },
        }
    }

    /// Whether the train/test split is stratified, or `None` when the
    /// procedure scores the whole shuffled dataset.
    pub fn stratified_split(&self) -> Option<bool> {
        match self {
            Procedure::EntropyGain | Procedure::Regression { .. } => None,
            Procedure::Classifier { per_feature, .. } => Some(!per_feature),
            Procedure::Network { .. } => Some(true),
        }
    }
}

/// Results averaged over all shuffles.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSummary {
    /// Mean information gain per feature.
    EntropyGain(Array1<f64>),
    /// Mean per-feature R² and p-values, plus the features passing the
    /// Bonferroni threshold on the mean p-values.
    Regression {
        r2: Array1<f64>,
        p_values: Array1<f64>,
        significant: Vec<(usize, f64)>,
    },
    /// Mean R² of the all-feature least-squares fit.
    MultivariateR2(f64),
    /// Mean held-out accuracies and the candidate chosen on every shuffle.
    Accuracy {
        accuracies: ClassAccuracies,
        selected: Vec<f64>,
    },
    /// Mean held-out accuracy per feature.
    SingleFeatureAccuracy(Array1<f64>),
}

/// Run `f` on every seeded permutation of `data`, in parallel, returning the
/// results in shuffle order.
fn per_shuffle<T, F>(data: &Dataset, num_shuffles: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &Dataset) -> Result<T> + Sync,
{
    (0..num_shuffles)
        .into_par_iter()
        .map(|i| {
            let shuffled = data.permuted(i as u64);
            let result = f(i, &shuffled);
            match &result {
                Ok(_) => log::info!("Shuffle {}/{} finished", i + 1, num_shuffles),
                Err(e) => log::error!("Shuffle {}/{} failed: {}", i + 1, num_shuffles, e),
            }
            result
        })
        .collect()
}

fn mean_accuracies(reports: &[ClassAccuracies]) -> ClassAccuracies {
    ClassAccuracies {
        overall: incremental_mean(reports.iter().map(|r| r.overall)),
        class_0: incremental_mean(reports.iter().map(|r| r.class_0)),
        class_1: incremental_mean(reports.iter().map(|r| r.class_1)),
    }
}

fn mean_arrays(values: Vec<Array1<f64>>) -> Result<Array1<f64>> {
    incremental_mean_arrays(values)
        .ok_or_else(|| EvalError::InvalidConfig("no shuffles were run".to_string()))
}

fn log_compatibility_notices(config: &EvaluationConfig) {
    if config.model_type != ModelType::Net {
        return;
    }
    if config.learning_rate_policy == LearningRatePolicy::Fixed {
        log::warn!(
            "Learning-rate candidates only steer selection: the optimizer step size is fixed. \
             Set learning_rate_policy = \"configured\" to train with the selected rate."
        );
    }
    if config.per_feature
        && config.single_feature_selection == SingleFeatureSelection::LastCandidate
    {
        log::warn!(
            "Single-feature network sweep uses the last learning-rate candidate for every feature. \
             Set single_feature_selection = \"best_score\" to pick the best cross-validated rate."
        );
    }
}

/// Binarize the labels of `dataset` once, then evaluate the configured
/// procedure over `config.num_shuffles` seeded permutations.
pub fn run(dataset: &Dataset, config: &EvaluationConfig) -> Result<RunSummary> {
    config.validate()?;
    let mut data = dataset.clone();
    data.binarize(config.binarization_threshold);
    data.log_input_data_summary();

    let procedure = Procedure::from_config(config);
    log::info!(
        "Running {:?} over {} shuffles",
        procedure,
        config.num_shuffles
    );
    log_compatibility_notices(config);

    let n = config.num_shuffles;
    let candidates = config.candidates();
    let stratify = procedure.stratified_split().unwrap_or(false);
    let split = |shuffled: &Dataset| -> Result<(Dataset, Dataset)> {
        let split = train_test_split(&shuffled.y, config.test_fraction, SPLIT_SEED, stratify)?;
        Ok(shuffled.split(&split))
    };

    let summary = match procedure {
        Procedure::EntropyGain => {
            let gains = per_shuffle(&data, n, |_, d| entropy_gain(&d.x, &d.y))?;
            RunSummary::EntropyGain(mean_arrays(gains)?)
        }
        Procedure::Regression { per_feature: true } => {
            let scores = per_shuffle(&data, n, |_, d| univariate_regression(&d.x, &d.y))?;
            let (r2, p): (Vec<_>, Vec<_>) = scores.into_iter().map(|s| (s.r2, s.p_values)).unzip();
            let p_values = mean_arrays(p)?;
            let significant = significant_features(&p_values, config.significance_alpha);
            RunSummary::Regression {
                r2: mean_arrays(r2)?,
                p_values,
                significant,
            }
        }
        Procedure::Regression { per_feature: false } => {
            let fits = per_shuffle(&data, n, |_, d| multivariate_r2(&d.x, &d.y))?;
            RunSummary::MultivariateR2(incremental_mean(fits))
        }
        Procedure::Classifier { family, per_feature: true } => {
            let accs = per_shuffle(&data, n, |_, d| {
                let (train, test) = split(d)?;
                evaluate_single_feature(&train, &test, family, &candidates, config.num_splits)
            })?;
            RunSummary::SingleFeatureAccuracy(mean_arrays(accs)?)
        }
        Procedure::Classifier { family, per_feature: false } => {
            let reports = per_shuffle(&data, n, |i, d| {
                let (train, test) = split(d)?;
                let report = evaluate(&train, &test, family, &candidates, config.num_splits)?;
                log::debug!("Shuffle {}: accuracy {:.4}", i, report.accuracies.overall);
                Ok(report)
            })?;
            RunSummary::Accuracy {
                accuracies: mean_accuracies(
                    &reports.iter().map(|r| r.accuracies).collect::<Vec<_>>(),
                ),
                selected: reports.iter().map(|r| r.selected.candidate).collect(),
            }
        }
        Procedure::Network { per_feature: true } => {
            let settings = NetworkSettings::from_config(config);
            let accs = per_shuffle(&data, n, |_, d| {
                let (train, test) = split(d)?;
                evaluate_network_single_feature(&train, &test, &candidates, &settings)
            })?;
            RunSummary::SingleFeatureAccuracy(mean_arrays(accs)?)
        }
        Procedure::Network { per_feature: false } => {
            let settings = NetworkSettings::from_config(config);
            let reports = per_shuffle(&data, n, |i, d| {
                let (train, test) = split(d)?;
                let report = evaluate_network(&train, &test, &candidates, &settings)?;
                log::debug!(
                    "Shuffle {}: accuracy {:.4} (best epoch {})",
                    i,
                    report.accuracies.overall,
                    report.best_epoch
                );
                Ok(report)
            })?;
            RunSummary::Accuracy {
                accuracies: mean_accuracies(
                    &reports.iter().map(|r| r.accuracies).collect::<Vec<_>>(),
                ),
                selected: reports.iter().map(|r| r.selected.candidate).collect(),
            }
        }
    };

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_procedure_from_config() {
        let mut config = EvaluationConfig::new(ModelType::Tree);
        config.per_feature = true;
        assert_eq!(
            Procedure::from_config(&config),
            Procedure::Classifier { family: ClassifierFamily::Tree, per_feature: true }
        );
        assert_eq!(
            Procedure::from_config(&EvaluationConfig::new(ModelType::Entropy)),
            Procedure::EntropyGain
        );
    }

    #[test]
    fn test_failed_shuffle_fails_the_run() {
        let data = Dataset::new(array![[0.0], [1.0], [2.0]], array![0.0, 1.0, 0.0]).unwrap();
        let ok = per_shuffle(&data, 3, |i, d| Ok((i, d.n_samples()))).unwrap();
        assert_eq!(ok, vec![(0, 3), (1, 3), (2, 3)]);

        let failed = per_shuffle(&data, 3, |i, _| match i {
            1 => Err(EvalError::EmptyCandidates),
            _ => Ok(i),
        });
        assert!(matches!(failed, Err(EvalError::EmptyCandidates)));
    }

    #[test]
    fn test_split_stratification_per_procedure() {
        let svm = Procedure::Classifier { family: ClassifierFamily::Svm, per_feature: false };
        let svm_single = Procedure::Classifier { family: ClassifierFamily::Svm, per_feature: true };
        assert_eq!(svm.stratified_split(), Some(true));
        assert_eq!(svm_single.stratified_split(), Some(false));
        assert_eq!(Procedure::Network { per_feature: false }.stratified_split(), Some(true));
        assert_eq!(Procedure::Network { per_feature: true }.stratified_split(), Some(true));
        assert_eq!(Procedure::EntropyGain.stratified_split(), None);
        assert_eq!(Procedure::Regression { per_feature: true }.stratified_split(), None);
    }

    #[test]
    fn test_entropy_run_on_separable_feature() {
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let data = Dataset::new(x, y).unwrap();
        let config = EvaluationConfig {
            num_shuffles: 3,
            ..EvaluationConfig::new(ModelType::Entropy)
        };
        match run(&data, &config).unwrap() {
            RunSummary::EntropyGain(gain) => assert!((gain[0] - 1.0).abs() < 1e-12),
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_labels_are_binarized_before_scoring() {
        // Raw labels 0 / 2 / 5 collapse to 0 / 1 / 1 at threshold 1.
        let x = Array2::from_shape_vec((6, 1), vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        let y = array![0.0, 0.0, 2.0, 5.0, 2.0, 5.0];
        let data = Dataset::new(x, y).unwrap();
        let config = EvaluationConfig {
            num_shuffles: 1,
            binarization_threshold: 1.0,
            ..EvaluationConfig::new(ModelType::Entropy)
        };
        match run(&data, &config).unwrap() {
            RunSummary::EntropyGain(gain) => {
                let h = -(1.0 / 3.0f64) * (1.0 / 3.0f64).log2()
                    - (2.0 / 3.0f64) * (2.0 / 3.0f64).log2();
                assert!((gain[0] - h).abs() < 1e-12);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }
}
