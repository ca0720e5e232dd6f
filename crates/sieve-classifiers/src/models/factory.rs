use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::knn::KnnClassifier;
use crate::models::svm::LinearSvmClassifier;
use crate::models::tree::DecisionTreeClassifier;

/// Classifier families that expose `fit`/`predict` and take one scalar
/// hyperparameter.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierFamily {
    /// Linear-kernel soft-margin SVM; the candidate is the cost `C`.
    Svm,
    /// k-nearest-neighbour vote; the candidate is `k` (truncated to an integer).
    Knn,
    /// Entropy decision tree; the candidate is the maximum depth (truncated).
    Tree,
}

impl ClassifierFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierFamily::Svm => "svm",
            ClassifierFamily::Knn => "knn",
            ClassifierFamily::Tree => "tree",
        }
    }

    /// Build a fresh, unfitted classifier for one hyperparameter candidate.
    pub fn build_model(&self, param: f64) -> Result<Box<dyn ClassifierModel>> {
        match self {
            ClassifierFamily::Svm => {
                if !(param > 0.0) {
                    return Err(EvalError::InvalidHyperparameter { name: "C", value: param });
                }
                Ok(Box::new(LinearSvmClassifier::new(param)))
            }
            ClassifierFamily::Knn => {
                let k = integer_candidate("n_neighbors", param)?;
                Ok(Box::new(KnnClassifier::new(k)))
            }
            ClassifierFamily::Tree => {
                let depth = integer_candidate("max_depth", param)?;
                Ok(Box::new(DecisionTreeClassifier::new(depth)))
            }
        }
    }
}

fn integer_candidate(name: &'static str, value: f64) -> Result<usize> {
    let truncated = value.trunc();
    if !truncated.is_finite() || truncated < 1.0 {
        return Err(EvalError::InvalidHyperparameter { name, value });
    }
    Ok(truncated as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_model_validates_candidates() {
        assert!(ClassifierFamily::Svm.build_model(0.0).is_err());
        assert!(ClassifierFamily::Knn.build_model(0.5).is_err());
        assert!(ClassifierFamily::Tree.build_model(-2.0).is_err());
        assert_eq!(ClassifierFamily::Knn.build_model(3.9).unwrap().name(), "knn");
        assert_eq!(ClassifierFamily::Tree.build_model(2.0).unwrap().name(), "tree");
        assert_eq!(ClassifierFamily::Svm.build_model(1.0).unwrap().name(), "svm");
    }
}
