pub mod classifier_trait;
pub mod factory;
pub mod knn;
pub mod svm;
pub mod tree;
mod utils;
