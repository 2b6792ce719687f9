//! Dataset loading from uploaded files

use crate::config::InputConfig;
use crate::types::dataset::{Dataset, Value};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

/// Reads CSV and JSON transaction files into a `Dataset`
pub struct DatasetLoader {
    allowed_extensions: Vec<String>,
}

impl DatasetLoader {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `path` carries an accepted extension
    pub fn is_allowed<P: AsRef<Path>>(&self, path: P) -> bool {
        extension(path.as_ref())
            .map(|ext| self.allowed_extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// Detect the file format from the extension
    pub fn format_of<P: AsRef<Path>>(&self, path: P) -> Result<FileFormat> {
        let path = path.as_ref();
        if !self.is_allowed(path) {
            bail!("Unsupported file format: {}", path.display());
        }
        match extension(path).as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(anyhow!("Unsupported file format: {}", path.display())),
        }
    }

    /// Load a dataset from a CSV or JSON file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let format = self.format_of(path)?;

        let dataset = match format {
            FileFormat::Csv => read_csv(path),
            FileFormat::Json => read_json(path),
        }
        .with_context(|| format!("Error reading file: {}", path.display()))?;

        info!(
            path = %path.display(),
            format = ?format,
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Dataset loaded"
        );

        Ok(dataset)
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new(&InputConfig::default())
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// A finite number, if the trimmed cell reads as one
fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A column is numeric when every non-empty cell in it parses as a number
fn numeric_columns(width: usize, records: &[csv::StringRecord]) -> Vec<bool> {
    (0..width)
        .map(|col| {
            records.iter().all(|record| match record.get(col) {
                Some(cell) => cell.trim().is_empty() || parse_number(cell).is_some(),
                None => true,
            })
        })
        .collect()
}

/// Empty cells are null; the rest follow their column's type
fn parse_cell(cell: &str, numeric: bool) -> Value {
    if cell.trim().is_empty() {
        return Value::Null;
    }
    match parse_number(cell) {
        Some(n) if numeric => Value::Number(n),
        _ => Value::Text(cell.to_string()),
    }
}

fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;
    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let records = reader
        .records()
        .enumerate()
        .map(|(line, record)| record.with_context(|| format!("Malformed CSV record {}", line + 1)))
        .collect::<Result<Vec<_>>>()?;
    let numeric = numeric_columns(headers.len(), &records);

    let mut dataset = Dataset::new(headers);
    for record in &records {
        dataset.push_row(
            record
                .iter()
                .enumerate()
                .map(|(col, cell)| parse_cell(cell, numeric.get(col).copied().unwrap_or(false)))
                .collect(),
        )?;
    }
    Ok(dataset)
}

fn json_to_value(column: &str, value: serde_json::Value) -> Result<Value> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        serde_json::Value::Number(n) => Value::Number(
            n.as_f64()
                .ok_or_else(|| anyhow!("Column '{}': number {} out of range", column, n))?,
        ),
        serde_json::Value::String(s) => Value::Text(s),
        other => bail!("Column '{}': nested value {} is not a scalar", column, other),
    })
}

fn read_json(path: &Path) -> Result<Dataset> {
    let file = File::open(path).context("Failed to open JSON file")?;
    let document: serde_json::Value =
        serde_json::from_reader(BufReader::new(file)).context("Invalid JSON")?;

    let serde_json::Value::Array(items) = document else {
        bail!("Expected a JSON array of records");
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = item else {
            bail!("Record {} is not a JSON object", i);
        };
        let record = fields
            .into_iter()
            .map(|(name, value)| -> Result<(String, Value)> {
                let value = json_to_value(&name, value)?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>>>()?;
        records.push(record);
    }

    Ok(Dataset::from_records(records))
}
