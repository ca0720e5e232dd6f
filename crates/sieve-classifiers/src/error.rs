use std::error::Error;
use std::fmt;

/// Errors raised while partitioning data, fitting classifiers or scoring them.
#[derive(Debug)]
pub enum EvalError {
    /// Unknown model type, malformed candidate list, bad fractions, ...
    InvalidConfig(String),
    /// Feature matrix and label vector (or two matrices) disagree in size.
    ShapeMismatch { expected: usize, found: usize },
    /// A class has fewer members than the requested number of folds.
    DegenerateFold { label: i64, count: usize, n_splits: usize },
    /// Per-class accuracy requested for a label absent from the evaluated subset.
    EmptyClassSubset(i64),
    /// Training labels contain a single class.
    SingleClass(i64),
    InvalidHyperparameter { name: &'static str, value: f64 },
    EmptyCandidates,
    Network(candle_core::Error),
    /// The SVM solver rejected its parameters or data.
    Solver(linfa_svm::SvmError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            EvalError::ShapeMismatch { expected, found } => write!(
                f,
                "Row count mismatch: expected {} samples, found {}",
                expected, found
            ),
            EvalError::DegenerateFold { label, count, n_splits } => write!(
                f,
                "Class {} has {} samples, cannot stratify into {} folds",
                label, count, n_splits
            ),
            EvalError::EmptyClassSubset(label) => {
                write!(f, "No samples with label {} to compute per-class accuracy", label)
            }
            EvalError::SingleClass(label) => write!(
                f,
                "Training labels contain only class {}, at least 2 classes are required",
                label
            ),
            EvalError::InvalidHyperparameter { name, value } => {
                write!(f, "Invalid value {} for hyperparameter '{}'", value, name)
            }
            EvalError::EmptyCandidates => write!(f, "Hyperparameter candidate list is empty"),
            EvalError::Network(err) => write!(f, "Network training failed: {}", err),
            EvalError::Solver(err) => write!(f, "SVM training failed: {}", err),
        }
    }
}

impl Error for EvalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EvalError::Network(err) => Some(err),
            EvalError::Solver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<candle_core::Error> for EvalError {
    fn from(err: candle_core::Error) -> Self {
        EvalError::Network(err)
    }
}

impl From<linfa_svm::SvmError> for EvalError {
    fn from(err: linfa_svm::SvmError) -> Self {
        EvalError::Solver(err)
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
