use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;

use sieve_classifiers::config::{load_evaluation_config, EvaluationConfig, ModelType};
use sieve_classifiers::io::TableReaderConfig;

/// Everything `sieve evaluate` needs, after merging the configuration file
/// with command line overrides.
#[derive(Debug, Clone)]
pub struct EvaluateSettings {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub reader: TableReaderConfig,
    pub evaluation: EvaluationConfig,
}

impl EvaluateSettings {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let data_path = matches
            .get_one::<PathBuf>("data")
            .cloned()
            .context("Missing input feature table")?;

        let mut evaluation = match matches.get_one::<PathBuf>("config") {
            Some(path) => {
                log::info!("[sieve::evaluate] Using config: {}", path.display());
                load_evaluation_config(path)?
            }
            None => {
                let config = EvaluationConfig::default();
                log::debug!(
                    "[sieve::evaluate] No config provided, defaults:\n{}",
                    serde_json::to_string_pretty(&config).unwrap_or_default()
                );
                config
            }
        };

        if let Some(clf) = matches.get_one::<String>("clf") {
            evaluation.model_type = ModelType::from_str(clf).map_err(anyhow::Error::msg)?;
        }
        if let Some(params) = matches.get_one::<Vec<f64>>("params") {
            evaluation.hyperparameters = params.clone();
        }
        if matches.get_flag("single") {
            evaluation.per_feature = true;
        }
        if let Some(&threshold) = matches.get_one::<f64>("threshold") {
            evaluation.binarization_threshold = threshold;
        }
        if let Some(&epochs) = matches.get_one::<usize>("epochs") {
            evaluation.epochs = epochs;
        }
        if let Some(&shuffles) = matches.get_one::<usize>("shuffles") {
            evaluation.num_shuffles = shuffles;
        }

        let mut reader = TableReaderConfig::default();
        if let Some(label) = matches.get_one::<String>("label_column") {
            reader.label_column = label.clone();
        }
        reader.id_column = matches.get_one::<String>("id_column").cloned();

        let output_dir = matches
            .get_one::<PathBuf>("output_dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            data_path,
            output_dir,
            reader,
            evaluation,
        })
    }
}
