use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::models::factory::ClassifierFamily;

/// Analysis selected for a run. Exactly one is active per invocation.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    #[default]
    Svm,
    Knn,
    Tree,
    Entropy,
    LinReg,
    Net,
}

impl ModelType {
    pub const NAMES: [&'static str; 6] = ["svm", "knn", "tree", "entropy", "linreg", "net"];

    pub fn name(&self) -> &'static str {
        match self {
            ModelType::Svm => "svm",
            ModelType::Knn => "knn",
            ModelType::Tree => "tree",
            ModelType::Entropy => "entropy",
            ModelType::LinReg => "linreg",
            ModelType::Net => "net",
        }
    }

    /// The classifier family behind this model type, if it is one of the
    /// `fit`/`predict` families.
    pub fn classifier_family(&self) -> Option<ClassifierFamily> {
        match self {
            ModelType::Svm => Some(ClassifierFamily::Svm),
            ModelType::Knn => Some(ClassifierFamily::Knn),
            ModelType::Tree => Some(ClassifierFamily::Tree),
            _ => None,
        }
    }

    /// Candidate list used when the caller supplies none.
    pub fn default_candidates(&self) -> Vec<f64> {
        match self {
            ModelType::Svm => vec![1.0],
            ModelType::Knn | ModelType::Tree => vec![5.0],
            ModelType::Net => vec![0.1],
            ModelType::Entropy | ModelType::LinReg => Vec::new(),
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "svm" => Ok(ModelType::Svm),
            "knn" => Ok(ModelType::Knn),
            "tree" => Ok(ModelType::Tree),
            "entropy" => Ok(ModelType::Entropy),
            "linreg" => Ok(ModelType::LinReg),
            "net" => Ok(ModelType::Net),
            _ => Err(format!(
                "Unknown model type: {}. Options are {}",
                s,
                ModelType::NAMES.join(", ")
            )),
        }
    }
}

/// How the network trainer chooses the optimizer step size.
///
/// `Fixed` keeps the historical behaviour where the learning-rate argument is
/// accepted but Adam always runs with a step size of 0.005.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LearningRatePolicy {
    #[default]
    Fixed,
    Configured,
}

/// How the per-feature network sweep picks a learning rate.
///
/// `LastCandidate` keeps the historical behaviour where the best-so-far score is
/// reset for every candidate, so the last candidate always wins.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SingleFeatureSelection {
    #[default]
    LastCandidate,
    BestScore,
}

/// Central configuration for an evaluation run.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct EvaluationConfig {
    pub model_type: ModelType,
    /// Ordered hyperparameter candidates. Empty means the model type default.
    pub hyperparameters: Vec<f64>,
    /// Run the single-feature sweep instead of the full-feature pipeline.
    pub per_feature: bool,
    pub binarization_threshold: f64,
    pub num_shuffles: usize,
    pub num_splits: usize,
    pub test_fraction: f64,
    pub epochs: usize,
    pub significance_alpha: f64,
    pub learning_rate_policy: LearningRatePolicy,
    pub single_feature_selection: SingleFeatureSelection,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
            hyperparameters: Vec::new(),
            per_feature: false,
            binarization_threshold: 0.0,
            num_shuffles: 10,
            num_splits: 5,
            test_fraction: 0.2,
            epochs: 35,
            significance_alpha: 0.05,
            learning_rate_policy: LearningRatePolicy::default(),
            single_feature_selection: SingleFeatureSelection::default(),
        }
    }
}

impl EvaluationConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            ..Default::default()
        }
    }

    /// Candidates in sweep order, falling back to the model type default.
    pub fn candidates(&self) -> Vec<f64> {
        if self.hyperparameters.is_empty() {
            self.model_type.default_candidates()
        } else {
            self.hyperparameters.clone()
        }
    }

    /// Check the configuration before any computation starts.
    pub fn validate(&self) -> Result<()> {
        if self.num_shuffles == 0 {
            return Err(EvalError::InvalidConfig("num_shuffles must be at least 1".to_string()));
        }
        if self.num_splits < 2 {
            return Err(EvalError::InvalidConfig("num_splits must be at least 2".to_string()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(EvalError::InvalidConfig(format!(
                "test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.model_type == ModelType::Net && self.epochs == 0 {
            return Err(EvalError::InvalidConfig("epochs must be at least 1".to_string()));
        }
        if self.hyperparameters.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::InvalidConfig(
                "hyperparameter candidates must be finite numbers".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma separated candidate list such as `0.1,1,10`.
pub fn parse_candidates(s: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|elem| {
            elem.trim().parse::<f64>().map_err(|_| {
                EvalError::InvalidConfig(format!("Malformed hyperparameter '{}' in '{}'", elem, s))
            })
        })
        .collect()
}

/// Load an evaluation configuration from a JSON file.
pub fn load_evaluation_config<P: AsRef<Path>>(path: P) -> anyhow::Result<EvaluationConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: EvaluationConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidates() {
        assert_eq!(parse_candidates("0.1, 1,10").unwrap(), vec![0.1, 1.0, 10.0]);
        assert!(parse_candidates("").unwrap().is_empty());
        assert!(parse_candidates("1,abc").is_err());
    }

    #[test]
    fn test_empty_candidates_fall_back_to_default() {
        let config = EvaluationConfig::new(ModelType::Knn);
        assert_eq!(config.candidates(), vec![5.0]);

        let config = EvaluationConfig {
            hyperparameters: vec![3.0, 7.0],
            ..EvaluationConfig::new(ModelType::Knn)
        };
        assert_eq!(config.candidates(), vec![3.0, 7.0]);
    }

    #[test]
    fn test_model_type_round_trips_through_name() {
        for name in ModelType::NAMES {
            let mt: ModelType = name.parse().unwrap();
            assert_eq!(mt.name(), name);
        }
        assert!("forest".parse::<ModelType>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let config = EvaluationConfig {
            test_fraction: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(EvaluationConfig::default().validate().is_ok());
    }
}
