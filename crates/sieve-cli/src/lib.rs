//! Command line front-end for sieve-classifiers.
pub mod evaluate;
