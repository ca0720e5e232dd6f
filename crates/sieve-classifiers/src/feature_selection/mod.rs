//! Feature scoring.
//!
//! Univariate scores (information gain, least-squares R² with its p-value)
//! rate each column against the label on its own; `multivariate_r2` fits all
//! columns jointly.
pub mod entropy;
pub mod regression;
pub mod univariate_selection;

pub use entropy::entropy_gain;
pub use regression::multivariate_r2;
pub use univariate_selection::{significant_features, univariate_regression, RegressionScores};
