use ndarray::{Array1, Array2};

use crate::error::Result;

/// A small trait abstraction for the classifier families swept by the
/// selector. Labels follow the crate convention (0.0 / 1.0 after
/// binarization); predictions use the same encoding.
pub trait ClassifierModel: Send {
    /// Fit the model on a training block.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict a class label for every row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
