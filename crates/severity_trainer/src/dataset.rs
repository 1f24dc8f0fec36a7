//! CSV dataset loading
//!
//! Reads the accident CSV by header name, drops incomplete records and
//! decides per column whether cells are numbers or text before handing rows
//! to the feature transform.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use traffic_severity_core::serde_canon::hash_bytes_hex;
use traffic_severity_core::{FeatureRow, FeatureSchema, FeatureValue};

use crate::errors::DatasetError;

/// Cell contents treated as missing
const NA_TOKENS: [&str; 19] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#NA", "#N/A N/A", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN",
];

pub fn is_missing(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

/// Labelled training rows
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub rows: Vec<FeatureRow>,
    /// Raw label of each row
    pub labels: Vec<String>,
    /// Records dropped for a missing feature or label
    pub dropped_rows: usize,
    /// Blake3 of the source bytes
    pub data_hash: String,
}

impl Dataset {
    /// Load from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        info!(path = %path.display(), bytes = bytes.len(), "reading dataset");
        Self::from_reader(bytes.as_slice(), schema)
    }

    /// Load from any CSV source with a header row
    pub fn from_reader<R: Read>(mut reader: R, schema: &FeatureSchema) -> Result<Self, DatasetError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes.as_slice());

        let headers = csv_reader.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let label_idx =
            position(&schema.label).ok_or_else(|| DatasetError::MissingLabel(schema.label.clone()))?;
        let columns: Vec<(&str, usize)> = schema
            .feature_columns()
            .map(|name| {
                position(name)
                    .map(|idx| (name, idx))
                    .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
            })
            .collect::<Result<_, _>>()?;

        // Raw cells of complete records, column-major
        let mut cells: Vec<Vec<(u64, String)>> = vec![Vec::new(); columns.len()];
        let mut labels = Vec::new();
        let mut dropped_rows = 0;

        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let label = record.get(label_idx).unwrap_or("");
            let complete = !is_missing(label)
                && columns
                    .iter()
                    .all(|(_, idx)| !is_missing(record.get(*idx).unwrap_or("")));
            if !complete {
                dropped_rows += 1;
                continue;
            }

            for (column_cells, (_, idx)) in cells.iter_mut().zip(&columns) {
                column_cells.push((line, record.get(*idx).unwrap_or("").to_string()));
            }
            labels.push(label.to_string());
        }

        if dropped_rows > 0 {
            warn!(dropped_rows, "dropped records with missing values");
        }
        if labels.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut rows = vec![FeatureRow::new(); labels.len()];
        for ((name, _), column_cells) in columns.iter().zip(cells) {
            let values = column_values(schema, name, column_cells)?;
            for (row, value) in rows.iter_mut().zip(values) {
                row.insert(*name, value);
            }
        }

        let dataset = Self {
            rows,
            labels,
            dropped_rows,
            data_hash: hash_bytes_hex(&bytes),
        };
        info!(
            rows = dataset.len(),
            dropped = dataset.dropped_rows,
            hash = %dataset.data_hash,
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count per raw label
    pub fn class_distribution(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows and labels at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> (Vec<FeatureRow>, Vec<&str>) {
        indices
            .iter()
            .map(|&i| (self.rows[i].clone(), self.labels[i].as_str()))
            .unzip()
    }
}

/// Typed values of one column
///
/// Numeric columns must parse; a binary column that does not parse as a
/// whole is kept as text for the yes/no dictionary; a categorical column
/// that parses as a whole is kept numeric so `1.0` and `1` share a category.
fn column_values(
    schema: &FeatureSchema,
    name: &str,
    cells: Vec<(u64, String)>,
) -> Result<Vec<FeatureValue>, DatasetError> {
    let parsed: Option<Vec<f64>> = cells.iter().map(|(_, c)| c.parse::<f64>().ok()).collect();
    let is_numeric = schema.numeric.iter().any(|c| c == name);

    match parsed {
        Some(numbers) => Ok(numbers.into_iter().map(FeatureValue::Number).collect()),
        None if schema.is_binary(name) => {
            debug!(column = name, "binary column holds text, normalizing through dictionary");
            Ok(cells.into_iter().map(|(_, c)| FeatureValue::Text(c)).collect())
        }
        None if is_numeric => {
            let (line, value) = cells
                .into_iter()
                .find(|(_, c)| c.parse::<f64>().is_err())
                .unwrap_or_default();
            Err(DatasetError::InvalidNumber {
                line,
                column: name.to_string(),
                value,
            })
        }
        None => Ok(cells.into_iter().map(|(_, c)| FeatureValue::Text(c)).collect()),
    }
}
