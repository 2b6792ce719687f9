//! Tabular transaction data handed to the detection core

use crate::error::{DetectionError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Text layouts accepted for timestamp columns, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

/// Kind of a non-null value, used for column consistency checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Text,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Number => write!(f, "number"),
            ValueKind::Text => write!(f, "text"),
            ValueKind::Timestamp => write!(f, "timestamp"),
        }
    }
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Number(_) => Some(ValueKind::Number),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Grouping key for entity columns. Nulls have no key.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(n.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Timestamp(ts) => Some(ts.to_string()),
        }
    }

    /// Interpret the value as a transaction amount.
    ///
    /// Nulls are missing amounts; anything other than a number is a format
    /// error for the named column.
    pub fn as_amount(&self, column: &str) -> Result<Option<f64>> {
        match self {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            other => Err(DetectionError::data_format(
                column,
                format!("expected a numeric amount, found {}", other.describe()),
            )),
        }
    }

    /// Interpret the value as a point in time.
    ///
    /// Numbers are Unix epoch seconds. Text is parsed against RFC 3339 and
    /// the common layouts in `DATETIME_FORMATS` / `DATE_FORMATS`.
    pub fn as_timestamp(&self, column: &str) -> Result<Option<NaiveDateTime>> {
        match self {
            Value::Null => Ok(None),
            Value::Timestamp(ts) => Ok(Some(*ts)),
            Value::Number(n) => {
                let secs = n.floor();
                let nanos = ((n - secs) * 1e9) as u32;
                DateTime::from_timestamp(secs as i64, nanos)
                    .map(|dt| Some(dt.naive_utc()))
                    .ok_or_else(|| {
                        DetectionError::data_format(
                            column,
                            format!("epoch value {} is out of range", n),
                        )
                    })
            }
            Value::Text(s) => parse_timestamp(s.trim()).map(Some).ok_or_else(|| {
                DetectionError::data_format(column, format!("cannot parse '{}' as a timestamp", s))
            }),
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Number(n) => format!("number {}", n),
            Value::Text(s) => format!("text '{}'", s),
            Value::Timestamp(ts) => format!("timestamp {}", ts),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// An ordered table of rows sharing one column set.
///
/// Rows are positional: `rows[i][j]` is the value of `columns[j]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create an empty dataset with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a dataset from positional rows, checking every row's width
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut dataset = Self::new(columns);
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Build a dataset from keyed records.
    ///
    /// Columns appear in first-seen order; a record lacking a column gets a
    /// null in that position.
    pub fn from_records(records: Vec<Vec<(String, Value)>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for (name, _) in record {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = vec![Value::Null; columns.len()];
                for (name, value) in record {
                    if let Some(idx) = columns.iter().position(|c| *c == name) {
                        row[idx] = value;
                    }
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DetectionError::data_format(
                format!("row {}", self.rows.len()),
                format!(
                    "expected {} values, found {}",
                    self.columns.len(),
                    row.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column in row order, or `None` if the column is absent
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// A row as a column-name → value map
    pub fn record(&self, index: usize) -> Option<BTreeMap<String, Value>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }

    /// Check that every column holds values of a single kind (nulls aside).
    pub fn validate_column_kinds(&self) -> Result<()> {
        for (idx, name) in self.columns.iter().enumerate() {
            let mut seen: Option<ValueKind> = None;
            for (row_idx, row) in self.rows.iter().enumerate() {
                let Some(kind) = row[idx].kind() else {
                    continue;
                };
                match seen {
                    None => seen = Some(kind),
                    Some(expected) if expected != kind => {
                        return Err(DetectionError::data_format(
                            name.clone(),
                            format!(
                                "inconsistent value types: {} in earlier rows, {} at row {}",
                                expected, kind, row_idx
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Copy of the dataset with extra columns appended.
    ///
    /// `values` must hold one vector per new column, each as long as the
    /// dataset.
    pub fn with_columns(&self, names: &[&str], values: Vec<Vec<Value>>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(DetectionError::InvalidConfig(format!(
                "{} column names for {} value vectors",
                names.len(),
                values.len()
            )));
        }
        for (name, column) in names.iter().zip(&values) {
            if column.len() != self.rows.len() {
                return Err(DetectionError::data_format(
                    *name,
                    format!("expected {} values, found {}", self.rows.len(), column.len()),
                ));
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(names.iter().map(|n| n.to_string()));

        let mut rows = self.rows.clone();
        for column in values {
            for (row, value) in rows.iter_mut().zip(column) {
                row.push(value);
            }
        }

        Ok(Self { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_row() {
        let err = Dataset::from_rows(
            ["amount", "date"],
            vec![vec![Value::from(1.0)], vec![Value::from(2.0), Value::Null]],
        )
        .unwrap_err();

        assert!(matches!(err, DetectionError::DataFormat { .. }));
    }

    #[test]
    fn test_from_records_fills_missing_columns() {
        let dataset = Dataset::from_records(vec![
            vec![("amount".to_string(), Value::from(10.0))],
            vec![
                ("amount".to_string(), Value::from(20.0)),
                ("account".to_string(), Value::from("acc_1")),
            ],
        ]);

        assert_eq!(dataset.columns(), &["amount", "account"]);
        assert_eq!(dataset.row(0).unwrap()[1], Value::Null);
        assert_eq!(dataset.row(1).unwrap()[1], Value::from("acc_1"));
    }

    #[test]
    fn test_validate_column_kinds() {
        let ok = Dataset::from_rows(
            ["amount"],
            vec![vec![Value::from(1.0)], vec![Value::Null], vec![Value::from(3.0)]],
        )
        .unwrap();
        assert!(ok.validate_column_kinds().is_ok());

        let mixed = Dataset::from_rows(
            ["amount"],
            vec![vec![Value::from(1.0)], vec![Value::from("two")]],
        )
        .unwrap();
        match mixed.validate_column_kinds() {
            Err(DetectionError::DataFormat { column, .. }) => assert_eq!(column, "amount"),
            other => panic!("expected data format error, got {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_parsing_layouts() {
        let expected = ts("2024-03-05 14:30:00");
        for text in [
            "2024-03-05 14:30:00",
            "2024-03-05T14:30:00",
            "2024-03-05T14:30:00Z",
            "2024-03-05 14:30",
            "03/05/2024 14:30",
        ] {
            let parsed = Value::from(text).as_timestamp("date").unwrap();
            assert_eq!(parsed, Some(expected), "layout {}", text);
        }

        let date_only = Value::from("2024-03-05").as_timestamp("date").unwrap();
        assert_eq!(date_only, Some(ts("2024-03-05 00:00:00")));
    }

    #[test]
    fn test_timestamp_from_epoch_seconds() {
        let parsed = Value::from(0.0).as_timestamp("date").unwrap();
        assert_eq!(parsed, Some(ts("1970-01-01 00:00:00")));
    }

    #[test]
    fn test_unparseable_timestamp_is_error() {
        let err = Value::from("next tuesday").as_timestamp("date").unwrap_err();
        assert!(matches!(err, DetectionError::DataFormat { ref column, .. } if column == "date"));
    }

    #[test]
    fn test_amount_coercion() {
        assert_eq!(Value::from(12.5).as_amount("amount").unwrap(), Some(12.5));
        assert_eq!(Value::Null.as_amount("amount").unwrap(), None);
        assert!(Value::from("12.5").as_amount("amount").is_err());
    }

    #[test]
    fn test_with_columns_appends() {
        let dataset = Dataset::from_rows(
            ["amount"],
            vec![vec![Value::from(1.0)], vec![Value::from(2.0)]],
        )
        .unwrap();

        let extended = dataset
            .with_columns(
                &["flag"],
                vec![vec![Value::from("a"), Value::from("b")]],
            )
            .unwrap();

        assert_eq!(extended.columns(), &["amount", "flag"]);
        assert_eq!(extended.row(1).unwrap(), &[Value::from(2.0), Value::from("b")]);
        // original untouched
        assert_eq!(dataset.columns().len(), 1);
    }

    #[test]
    fn test_value_serialization_is_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::from(1.5),
            Value::from("acc"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,1.5,"acc"]"#);
    }
}
