use anyhow::Result;
use clap::error::ErrorKind;
use clap::{ArgMatches, Command};
use log::LevelFilter;

use sieve_cli::evaluate::{self, input::EvaluateSettings};

fn cli() -> Command {
    Command::new("sieve")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("Sieve - nested cross-validation and feature scoring for binarized labels")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(evaluate::command())
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("SIEVE_LOG", "error,sieve=info"))
        .init();

    let mut cmd = cli();
    let matches = cmd.clone().get_matches();

    match matches.subcommand() {
        Some(("evaluate", sub_m)) => handle_evaluate(&mut cmd, sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_evaluate(cmd: &mut Command, matches: &ArgMatches) -> Result<()> {
    let settings = EvaluateSettings::from_arguments(matches)?;

    // Configuration problems end the run before any computation, with usage.
    if let Err(e) = settings.evaluation.validate() {
        cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match evaluate::run_evaluation(&settings, &mut out) {
        Ok(files) => {
            log::info!("[sieve::evaluate] Completed, {} result files written", files.len());
            Ok(())
        }
        Err(e) => {
            log::error!("Evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
