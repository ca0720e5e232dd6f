//! sieve-classifiers: model-selection and evaluation engine for binary
//! classification over a feature matrix.
//!
//! This crate provides stratified partitioning, hyperparameter selection by
//! cross-validation, repeated shuffle evaluation of classifier families
//! (linear SVM, k-NN, decision tree and a small feed-forward network), and
//! univariate feature scoring by information gain and linear regression.
//!
//! Every random draw is seeded explicitly, so a run is reproducible from its
//! configuration alone.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod feature_selection;
pub mod io;
pub mod models;
pub mod network;
pub mod orchestrator;
pub mod pipeline;
pub mod selection;
pub mod stats;
