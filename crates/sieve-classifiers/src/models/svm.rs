//! Linear-kernel soft-margin support vector classifier backed by `linfa-svm`.

use linfa::traits::{Fit, Predict};
use linfa::Dataset as LinfaDataset;
use linfa_svm::{Svm, SvmError, SvmParams};
use ndarray::{Array1, Array2};

use crate::data_handling::class_label;
use crate::error::{EvalError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_columns, check_rows, sorted_classes};

/// Stopping tolerance of the SMO solver.
const SOLVER_EPS: f64 = 1e-3;

pub struct LinearSvmClassifier {
    c: f64,
    model: Option<Svm<f64, bool>>,
    n_features: usize,
    /// Labels mapped to `false` / `true` respectively.
    classes: [i64; 2],
}

impl LinearSvmClassifier {
    pub fn new(c: f64) -> Self {
        LinearSvmClassifier {
            c,
            model: None,
            n_features: 0,
            classes: [0, 1],
        }
    }

    fn params(&self) -> SvmParams<f64, bool> {
        // Equal weights for both classes: the cost is the candidate `C`.
        Svm::<f64, bool>::params()
            .eps(SOLVER_EPS)
            .pos_neg_weights(self.c, self.c)
            .linear_kernel()
    }
}

impl ClassifierModel for LinearSvmClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows(x, y)?;
        let classes = sorted_classes(y);
        match classes.as_slice() {
            [a, b] => self.classes = [*a, *b],
            [only] => return Err(EvalError::SingleClass(*only)),
            _ => {
                return Err(EvalError::InvalidConfig(format!(
                    "SVM expects binary labels, found {} classes",
                    classes.len()
                )))
            }
        }

        let positive = self.classes[1];
        let targets = y.mapv(|v| class_label(v) == positive);
        let dataset = LinfaDataset::new(x.to_owned(), targets);

        let fitted: std::result::Result<Svm<f64, bool>, SvmError> = self.params().fit(&dataset);
        let model = fitted?;
        log::trace!("SVM C={} fitted with {} support vectors", self.c, model.nsupport());
        self.model = Some(model);
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EvalError::InvalidConfig("SVM used before fit".to_string()))?;
        check_columns(self.n_features, x)?;
        let [neg, pos] = self.classes;
        let predicted: Array1<bool> = model.predict(x);
        Ok(predicted.mapv(|is_pos| if is_pos { pos as f64 } else { neg as f64 }))
    }

    fn name(&self) -> &str {
        "svm"
    }
}
