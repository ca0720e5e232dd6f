//! Delimited feature-table reader.
//!
//! One header row, one sample per row. The label column holds the raw
//! (unbinarized) response; an optional identity column names each sample;
//! every remaining column is parsed as a numeric feature.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::{Array1, Array2};

use crate::data_handling::Dataset;

/// A parsed table: the dataset plus the feature column names in order.
#[derive(Debug)]
pub struct FeatureTable {
    pub dataset: Dataset,
    pub feature_names: Vec<String>,
}

/// Configuration for reading feature tables.
#[derive(Debug, Clone)]
pub struct TableReaderConfig {
    /// Column holding the raw label.
    pub label_column: String,
    /// Optional column with sample identities.
    pub id_column: Option<String>,
    /// Field delimiter. When `None` it is chosen from the file extension:
    /// tab for `.tsv`/`.tab`/`.txt`, comma otherwise.
    pub delimiter: Option<u8>,
}

impl Default for TableReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            id_column: None,
            delimiter: None,
        }
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") | Some("txt") => b'\t',
        _ => b',',
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

/// Read a feature table with the default configuration.
pub fn read_feature_table<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
    read_feature_table_with_config(path, &TableReaderConfig::default())
}

/// Read a feature table using a custom configuration.
pub fn read_feature_table_with_config<P: AsRef<Path>>(
    path: P,
    config: &TableReaderConfig,
) -> Result<FeatureTable> {
    let path = path.as_ref();
    let delimiter = config.delimiter.unwrap_or_else(|| delimiter_for(path));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open feature table: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read feature table header row")?
        .clone();

    let label_idx = find_column(&headers, &config.label_column)
        .ok_or_else(|| anyhow!("Missing label column '{}'", config.label_column))?;
    let id_idx = match &config.id_column {
        Some(name) => Some(
            find_column(&headers, name).ok_or_else(|| anyhow!("Missing id column '{}'", name))?,
        ),
        None => None,
    };

    let feature_indices: Vec<usize> = (0..headers.len())
        .filter(|&idx| idx != label_idx && Some(idx) != id_idx)
        .collect();
    if feature_indices.is_empty() {
        return Err(anyhow!("No feature columns found in {}", path.display()));
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut ids = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let label = record
            .get(label_idx)
            .ok_or_else(|| anyhow!("Missing label value at row {}", row_idx + 1))?
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Invalid label at row {}", row_idx + 1))?;
        labels.push(label);

        if let Some(idx) = id_idx {
            ids.push(record.get(idx).unwrap_or_default().trim().to_string());
        }

        for &idx in &feature_indices {
            let value = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing feature value at row {}", row_idx + 1))?;
            let parsed = value.trim().parse::<f64>().with_context(|| {
                format!(
                    "Invalid feature '{}' at row {}",
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1
                )
            })?;
            features.push(parsed);
        }
    }

    let n_samples = labels.len();
    let x = Array2::from_shape_vec((n_samples, feature_indices.len()), features)
        .context("Failed to build feature matrix")?;
    let mut dataset = Dataset::new(x, Array1::from_vec(labels))?;
    if id_idx.is_some() {
        dataset = dataset.with_sample_ids(ids)?;
    }

    let feature_names = feature_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").trim().to_string())
        .collect();

    log::debug!(
        "Read {} samples x {} features from {}",
        n_samples,
        feature_indices.len(),
        path.display()
    );
    Ok(FeatureTable { dataset, feature_names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_csv_with_id_column() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "neuron,f1,label,f2").unwrap();
        writeln!(file, "a,0.5,3,1").unwrap();
        writeln!(file, "b,1.5,0,0").unwrap();

        let config = TableReaderConfig {
            id_column: Some("neuron".to_string()),
            ..Default::default()
        };
        let table = read_feature_table_with_config(file.path(), &config).unwrap();
        assert_eq!(table.feature_names, vec!["f1", "f2"]);
        assert_eq!(table.dataset.x, ndarray::array![[0.5, 1.0], [1.5, 0.0]]);
        assert_eq!(table.dataset.y, ndarray::array![3.0, 0.0]);
        assert_eq!(table.dataset.sample_ids, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_reads_tsv_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "label\tx").unwrap();
        writeln!(file, "1\t2.5").unwrap();
        let table = read_feature_table(file.path()).unwrap();
        assert_eq!(table.dataset.n_samples(), 1);
        assert_eq!(table.dataset.x[[0, 0]], 2.5);
    }

    #[test]
    fn test_reports_bad_values() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "label,x").unwrap();
        writeln!(file, "1,abc").unwrap();
        let err = read_feature_table(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid feature 'x' at row 1"));

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "y,x").unwrap();
        assert!(read_feature_table(file.path()).is_err());
    }
}
