use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndarray::Array1;

use sieve_classifiers::config::EvaluationConfig;
use sieve_classifiers::orchestrator::RunSummary;

/// Number formats of the per-feature result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Width 10, five decimals.
    Fixed,
    /// 18 significant decimals with a signed two-digit exponent.
    Scientific,
}

impl ValueFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            ValueFormat::Fixed => format!("{:10.5}", value),
            ValueFormat::Scientific => {
                let raw = format!("{:.18e}", value);
                match raw.split_once('e') {
                    Some((mantissa, exponent)) => {
                        let exponent: i32 = exponent.parse().unwrap_or(0);
                        let sign = if exponent < 0 { '-' } else { '+' };
                        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
                    }
                    // inf / NaN
                    None => raw,
                }
            }
        }
    }
}

/// Write one value per line.
pub fn write_values(path: &Path, values: &Array1<f64>, format: ValueFormat) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for &value in values.iter() {
        writeln!(writer, "{}", format.format(value))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer.flush()?;
    log::info!("[sieve::evaluate] Wrote {} values to {}", values.len(), path.display());
    Ok(())
}

/// Report `summary`: per-feature arrays go to files in `output_dir`, scalar
/// results and significance lists are printed to `out`.
pub fn write_summary<W: Write>(
    summary: &RunSummary,
    config: &EvaluationConfig,
    output_dir: &Path,
    out: &mut W,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut write_file = |name: &str, values: &Array1<f64>, format: ValueFormat| -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
        let path = output_dir.join(name);
        write_values(&path, values, format)?;
        written.push(path);
        Ok(())
    };

    match summary {
        RunSummary::EntropyGain(gains) => {
            write_file("entropies.txt", gains, ValueFormat::Fixed)?;
        }
        RunSummary::Regression {
            r2,
            p_values,
            significant,
        } => {
            write_file("r2.txt", r2, ValueFormat::Fixed)?;
            write_file("p.txt", p_values, ValueFormat::Scientific)?;
            for (feature, p) in significant {
                writeln!(out, "Feature {} has p-value {:e}", feature, p)?;
            }
            writeln!(
                out,
                "{} features pass p <= {} / {}",
                significant.len(),
                config.significance_alpha,
                p_values.len()
            )?;
        }
        RunSummary::MultivariateR2(r2) => {
            writeln!(out, "Mean R^2: {}", r2)?;
        }
        RunSummary::Accuracy {
            accuracies,
            selected,
        } => {
            writeln!(out, "Accuracy overall: {}", accuracies.overall)?;
            writeln!(out, "Accuracy class 0: {}", accuracies.class_0)?;
            writeln!(out, "Accuracy class 1: {}", accuracies.class_1)?;
            writeln!(out, "Selected hyperparameters: {:?}", selected)?;
        }
        RunSummary::SingleFeatureAccuracy(accuracies) => {
            let name = format!("{}_single.txt", config.model_type.name());
            write_file(&name, accuracies, ValueFormat::Fixed)?;
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_formats() {
        assert_eq!(ValueFormat::Fixed.format(0.5), "   0.50000");
        assert_eq!(ValueFormat::Fixed.format(-1.25), "  -1.25000");
        assert_eq!(ValueFormat::Scientific.format(1.0), "1.000000000000000000e+00");
        assert_eq!(ValueFormat::Scientific.format(0.125), "1.250000000000000000e-01");
        assert_eq!(ValueFormat::Scientific.format(0.0), "0.000000000000000000e+00");
    }
}
