//! Readers that turn delimited files into a [`Dataset`](crate::data_handling::Dataset).
pub mod feature_table;

pub use feature_table::{
    read_feature_table, read_feature_table_with_config, FeatureTable, TableReaderConfig,
};
