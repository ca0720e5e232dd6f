use std::fs;
use std::path::Path;

use clap::error::ErrorKind;
use sieve_classifiers::config::ModelType;
use sieve_cli::evaluate::{command, input::EvaluateSettings, run_evaluation};

fn write_table(dir: &Path, name: &str, rows: &[&str]) -> String {
    let path = dir.join(name);
    fs::write(&path, rows.join("\n") + "\n").expect("failed to write table");
    path.to_string_lossy().into_owned()
}

fn settings(args: &[&str]) -> EvaluateSettings {
    let matches = command()
        .try_get_matches_from(std::iter::once("evaluate").chain(args.iter().copied()))
        .expect("arguments should parse");
    EvaluateSettings::from_arguments(&matches).expect("settings should build")
}

#[test]
fn test_entropy_run_writes_gains() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_table(dir.path(), "net.csv", &["f,label", "0,0", "0,0", "1,3", "1,1"]);
    let out_dir = dir.path().join("out");

    let out = out_dir.to_str().unwrap();
    let settings = settings(&[&data, "--clf", "entropy", "--shuffles", "2", "-o", out]);
    assert_eq!(settings.evaluation.model_type, ModelType::Entropy);
    assert_eq!(settings.evaluation.num_shuffles, 2);

    let mut stdout = Vec::new();
    let files = run_evaluation(&settings, &mut stdout).unwrap();
    assert_eq!(files, vec![out_dir.join("entropies.txt")]);
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), "   1.00000\n");
}

#[test]
fn test_regression_run_reports_significance() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = vec!["id\tsignal\tflat\tlabel".to_string()];
    for i in 0..20 {
        let label = if i < 10 { 0 } else { 2 };
        rows.push(format!("n{}\t{}\t1\t{}", i, label * 5 + i % 2, label));
    }
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let data = write_table(dir.path(), "net.tsv", &rows);

    let settings = settings(&[
        &data,
        "-c",
        "linreg",
        "-s",
        "--shuffles",
        "1",
        "--id-column",
        "id",
        "-o",
        dir.path().to_str().unwrap(),
    ]);
    let mut stdout = Vec::new();
    let files = run_evaluation(&settings, &mut stdout).unwrap();
    assert_eq!(files.len(), 2);

    let r2 = fs::read_to_string(dir.path().join("r2.txt")).unwrap();
    assert_eq!(r2.lines().count(), 2);
    assert_eq!(r2.lines().nth(1), Some("   0.00000"));

    let printed = String::from_utf8(stdout).unwrap();
    assert!(printed.contains("Feature 0 has p-value"));
    assert!(printed.contains("1 features pass"));
}

#[test]
fn test_classifier_run_prints_accuracies() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = vec!["a,b,label".to_string()];
    for i in 0..40 {
        let class = i % 2;
        rows.push(format!("{},{},{}", class * 10 + i % 3, i % 5, class));
    }
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let data = write_table(dir.path(), "table.csv", &rows);

    let settings = settings(&[&data, "--clf", "knn", "--params", "1,3", "--shuffles", "2"]);
    assert_eq!(settings.evaluation.hyperparameters, vec![1.0, 3.0]);

    let mut stdout = Vec::new();
    let files = run_evaluation(&settings, &mut stdout).unwrap();
    assert!(files.is_empty());
    let printed = String::from_utf8(stdout).unwrap();
    assert!(printed.contains("Accuracy overall: 1"));
    assert!(printed.contains("Selected hyperparameters: [1.0, 1.0]"));
}

#[test]
fn test_invalid_arguments_are_usage_errors() {
    let err = command()
        .try_get_matches_from(["evaluate", "data.csv", "--clf", "forest"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    let err = command()
        .try_get_matches_from(["evaluate", "data.csv", "--clf", "svm", "--params", "1,x"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);

    let err = command().try_get_matches_from(["evaluate", "data.csv"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn test_config_file_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        concat!(
            r#"{"model_type": "net", "hyperparameters": [0.01, 0.1], "epochs": 12, "#,
            r#""single_feature_selection": "best_score"}"#,
        ),
    )
    .unwrap();

    let config = config_path.to_str().unwrap();
    let settings = settings(&["data.csv", "--config", config, "--epochs", "20"]);
    assert_eq!(settings.evaluation.model_type, ModelType::Net);
    assert_eq!(settings.evaluation.hyperparameters, vec![0.01, 0.1]);
    assert_eq!(settings.evaluation.epochs, 20);
    assert_eq!(settings.evaluation.num_shuffles, 10);
}
