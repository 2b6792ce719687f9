//! Feature construction from resolved transaction columns.
//!
//! Each feature is enabled by one column role. A role that did not resolve
//! removes its features from the matrix rather than zero-filling them, so the
//! matrix width varies between 0 and 4 columns.

use crate::column_resolver::ColumnRoles;
use crate::error::Result;
use crate::types::dataset::Dataset;
use chrono::{Datelike, Timelike};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A derived feature dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// ln(amount + 1)
    LogAmount,
    /// Hour of day, 0-23
    Hour,
    /// Day of week, Monday = 0
    DayOfWeek,
    /// Number of rows sharing the row's entity value
    EntityFrequency,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::LogAmount => "log_amount",
            Feature::Hour => "hour",
            Feature::DayOfWeek => "day_of_week",
            Feature::EntityFrequency => "entity_freq",
        }
    }
}

/// Row-major numeric features, index-aligned with the dataset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    features: Vec<Feature>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix directly from rows; every row must be `features.len()` wide
    pub fn from_rows(features: Vec<Feature>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == features.len()));
        Self { features, rows }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.features.iter().map(Feature::name).collect()
    }

    pub fn width(&self) -> usize {
        self.features.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// No rows or no columns: nothing can be isolated
    pub fn is_degenerate(&self) -> bool {
        self.rows.is_empty() || self.features.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }
}

/// Turns raw transaction columns into model input features
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature matrix for `dataset`.
    ///
    /// Fails only when the timestamp column holds an unparseable value or the
    /// amount column holds something other than numbers.
    pub fn build(&self, dataset: &Dataset, roles: &ColumnRoles) -> Result<FeatureMatrix> {
        let mut features = Vec::with_capacity(4);
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(4);

        if let Some(column) = &roles.amount {
            features.push(Feature::LogAmount);
            columns.push(log_amounts(dataset, column)?);
        }

        if let Some(column) = &roles.timestamp {
            let (hours, days) = time_parts(dataset, column)?;
            features.push(Feature::Hour);
            columns.push(hours);
            features.push(Feature::DayOfWeek);
            columns.push(days);
        }

        if let Some(column) = &roles.entity {
            features.push(Feature::EntityFrequency);
            columns.push(entity_frequencies(dataset, column));
        }

        if features.is_empty() {
            warn!("No column roles resolved; feature matrix is empty");
        }

        let rows: Vec<Vec<f64>> = (0..dataset.len())
            .map(|i| columns.iter().map(|col| col[i]).collect())
            .collect();

        let matrix = FeatureMatrix { features, rows };
        debug!(
            rows = matrix.len(),
            features = ?matrix.feature_names(),
            "Feature matrix built"
        );
        Ok(matrix)
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Missing or non-finite results are filled with zero
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn log_amounts(dataset: &Dataset, column: &str) -> Result<Vec<f64>> {
    let Some(values) = dataset.column(column) else {
        return Ok(vec![0.0; dataset.len()]);
    };
    values
        .map(|value| -> Result<f64> {
            let amount = value.as_amount(column)?;
            Ok(amount.map(|a| finite_or_zero((a + 1.0).ln())).unwrap_or(0.0))
        })
        .collect()
}

fn time_parts(dataset: &Dataset, column: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let Some(values) = dataset.column(column) else {
        return Ok((vec![0.0; dataset.len()], vec![0.0; dataset.len()]));
    };

    let mut hours = Vec::with_capacity(dataset.len());
    let mut days = Vec::with_capacity(dataset.len());
    for value in values {
        match value.as_timestamp(column)? {
            Some(ts) => {
                hours.push(ts.hour() as f64);
                days.push(ts.weekday().num_days_from_monday() as f64);
            }
            None => {
                hours.push(0.0);
                days.push(0.0);
            }
        }
    }

    Ok((hours, days))
}

fn entity_frequencies(dataset: &Dataset, column: &str) -> Vec<f64> {
    let Some(values) = dataset.column(column) else {
        return vec![0.0; dataset.len()];
    };
    let keys: Vec<Option<String>> = values.map(|v| v.key()).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys.iter().flatten() {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }

    // rows without an entity have no group and count as zero
    keys.iter()
        .map(|key| {
            key.as_deref()
                .and_then(|k| counts.get(k))
                .map(|&n| n as f64)
                .unwrap_or(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_resolver::ColumnResolver;
    use crate::error::DetectionError;
    use crate::types::dataset::Value;

    fn sample_dataset() -> Dataset {
        Dataset::from_rows(
            ["amount", "date", "account"],
            vec![
                vec![Value::from(0.0), Value::from("2024-01-01 09:15:00"), Value::from("a")],
                vec![Value::from(99.0), Value::from("2024-01-06 23:59:00"), Value::from("b")],
                vec![Value::Null, Value::Null, Value::from("a")],
                vec![Value::from(f64::exp(2.0) - 1.0), Value::from("2024-01-03 00:00:00"), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_all_features_present() {
        let dataset = sample_dataset();
        let roles = ColumnResolver::default().resolve(dataset.columns());
        let matrix = FeatureBuilder::new().build(&dataset, &roles).unwrap();

        assert_eq!(
            matrix.feature_names(),
            vec!["log_amount", "hour", "day_of_week", "entity_freq"]
        );
        assert_eq!(matrix.len(), 4);

        // 2024-01-01 is a Monday
        assert_eq!(matrix.row(0), &[0.0, 9.0, 0.0, 2.0]);
        // ln(100), Saturday
        assert!((matrix.row(1)[0] - 100f64.ln()).abs() < 1e-12);
        assert_eq!(&matrix.row(1)[1..], &[23.0, 5.0, 1.0]);
        // nulls become zero
        assert_eq!(matrix.row(2), &[0.0, 0.0, 0.0, 2.0]);
        assert!((matrix.row(3)[0] - 2.0).abs() < 1e-12);
        assert_eq!(matrix.row(3)[3], 0.0);
    }

    #[test]
    fn test_unresolved_roles_are_omitted() {
        let dataset = sample_dataset();
        let roles = ColumnRoles {
            amount: Some("amount".to_string()),
            ..ColumnRoles::default()
        };
        let matrix = FeatureBuilder::new().build(&dataset, &roles).unwrap();

        assert_eq!(matrix.width(), 1);
        assert_eq!(matrix.features(), &[Feature::LogAmount]);
    }

    #[test]
    fn test_roles_naming_absent_columns_are_zero_filled() {
        let dataset = Dataset::from_rows(
            ["amount"],
            vec![vec![Value::from(10.0)], vec![Value::from(20.0)]],
        )
        .unwrap();
        let roles = ColumnRoles {
            amount: Some("amount".to_string()),
            timestamp: Some("date".to_string()),
            entity: Some("account".to_string()),
        };
        let matrix = FeatureBuilder::new().build(&dataset, &roles).unwrap();

        assert_eq!(matrix.width(), 4);
        assert_eq!(matrix.len(), 2);
        for row in matrix.rows() {
            assert_eq!(&row[1..], &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_no_roles_gives_zero_width() {
        let dataset = sample_dataset();
        let matrix = FeatureBuilder::new()
            .build(&dataset, &ColumnRoles::default())
            .unwrap();

        assert_eq!(matrix.width(), 0);
        assert_eq!(matrix.len(), 4);
        assert!(matrix.is_degenerate());
    }

    #[test]
    fn test_amount_below_minus_one_is_zero_filled() {
        let dataset = Dataset::from_rows(["amount"], vec![vec![Value::from(-5.0)]]).unwrap();
        let roles = ColumnResolver::default().resolve(dataset.columns());
        let matrix = FeatureBuilder::new().build(&dataset, &roles).unwrap();
        assert_eq!(matrix.row(0), &[0.0]);
    }

    #[test]
    fn test_unparseable_timestamp_fails_run() {
        let dataset = Dataset::from_rows(
            ["date"],
            vec![vec![Value::from("2024-01-01")], vec![Value::from("not a date")]],
        )
        .unwrap();
        let roles = ColumnResolver::default().resolve(dataset.columns());

        match FeatureBuilder::new().build(&dataset, &roles) {
            Err(DetectionError::DataFormat { column, .. }) => assert_eq!(column, "date"),
            other => panic!("expected data format error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_entities_group_by_value() {
        let dataset = Dataset::from_rows(
            ["user"],
            vec![
                vec![Value::from(7.0)],
                vec![Value::from(7.0)],
                vec![Value::from(8.0)],
            ],
        )
        .unwrap();
        let roles = ColumnResolver::default().resolve(dataset.columns());
        let matrix = FeatureBuilder::new().build(&dataset, &roles).unwrap();

        let freqs: Vec<f64> = matrix.rows().iter().map(|r| r[0]).collect();
        assert_eq!(freqs, vec![2.0, 2.0, 1.0]);
    }
}
