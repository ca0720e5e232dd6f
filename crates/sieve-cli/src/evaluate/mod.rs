//! The `sieve evaluate` subcommand.
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, Command, ValueHint};

use sieve_classifiers::config::{parse_candidates, ModelType};
use sieve_classifiers::io::read_feature_table_with_config;
use sieve_classifiers::orchestrator;

pub mod input;
pub mod output;

use input::EvaluateSettings;

/// Definition of the `evaluate` subcommand.
pub fn command() -> Command {
    Command::new("evaluate")
        .about("Evaluate classifiers or score features over repeated shuffles")
        .arg(
            Arg::new("data")
                .help("Feature table (*.csv or *.tsv) with a header row")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("clf")
                .short('c')
                .long("clf")
                .help("Analysis to run. Overrides the model type in the configuration file.")
                .value_parser(ModelType::NAMES)
                .required_unless_present("config"),
        )
        .arg(
            Arg::new("params")
                .short('p')
                .long("params")
                .help("Comma separated hyperparameter candidates, e.g. 0.1,1,10")
                .value_parser(|s: &str| parse_candidates(s).map_err(|e| e.to_string()))
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("single")
                .short('s')
                .long("single")
                .help("Evaluate every feature on its own instead of all features together")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .help("Labels above this value become class 1, all others class 0")
                .value_parser(clap::value_parser!(f64))
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("epochs")
                .long("epochs")
                .help("Training epochs per network fit")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("shuffles")
                .long("shuffles")
                .help("Number of seeded shuffles to average over")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("label_column")
                .long("label-column")
                .help("Name of the label column (default: label)")
                .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        )
        .arg(
            Arg::new("id_column")
                .long("id-column")
                .help("Name of an optional sample identity column")
                .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .help("Directory for per-feature result files (default: current directory)")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to an evaluation JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
}

/// Read the data, run every shuffle and write the results. Human readable
/// results go to `out`; the paths of written files are returned.
pub fn run_evaluation<W: Write>(settings: &EvaluateSettings, out: &mut W) -> Result<Vec<PathBuf>> {
    log::info!(
        "[sieve::evaluate] {} on {}",
        settings.evaluation.model_type.name(),
        settings.data_path.display()
    );
    let table = read_feature_table_with_config(&settings.data_path, &settings.reader)?;
    let summary = orchestrator::run(&table.dataset, &settings.evaluation)?;
    output::write_summary(&summary, &settings.evaluation, &settings.output_dir, out)
}
