//! k-nearest-neighbour classifier with Euclidean distance and uniform vote.

use ndarray::{Array1, Array2, ArrayView1};

use crate::data_handling::class_label;
use crate::error::{EvalError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_columns, check_rows, majority_label};

pub struct KnnClassifier {
    k: usize,
    x_train: Option<Array2<f64>>,
    y_train: Vec<i64>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        KnnClassifier {
            k,
            x_train: None,
            y_train: Vec::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

impl ClassifierModel for KnnClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows(x, y)?;
        if self.k > x.nrows() {
            return Err(EvalError::InvalidHyperparameter {
                name: "n_neighbors",
                value: self.k as f64,
            });
        }
        self.x_train = Some(x.to_owned());
        self.y_train = y.iter().map(|&v| class_label(v)).collect();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self
            .x_train
            .as_ref()
            .ok_or_else(|| EvalError::InvalidConfig("k-NN used before fit".to_string()))?;
        check_columns(x_train.ncols(), x)?;

        let predictions = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut neighbours: Vec<(f64, usize)> = x_train
                    .rows()
                    .into_iter()
                    .enumerate()
                    .map(|(i, train_row)| (squared_distance(row, train_row), i))
                    .collect();
                // Stable: equal distances keep training order.
                neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
                let nearest = neighbours.iter().take(self.k).map(|&(_, i)| self.y_train[i]);
                let label = majority_label(nearest);
                label as f64
            })
            .collect::<Vec<f64>>();

        Ok(Array1::from_vec(predictions))
    }

    fn name(&self) -> &str {
        "knn"
    }
}
