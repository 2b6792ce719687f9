//! Fraud taxonomy for a set of outlier rows

use crate::column_resolver::ColumnRoles;
use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::types::dataset::Dataset;
use crate::types::report::FraudType;
use tracing::debug;

/// Assigns fraud labels to the outlier subset using simple statistics.
///
/// Rules are independent and evaluated in a fixed order; the result is never
/// empty.
pub struct FraudClassifier {
    config: ClassifierConfig,
}

impl FraudClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify the rows of `dataset` listed in `outliers`
    pub fn classify(
        &self,
        dataset: &Dataset,
        outliers: &[usize],
        roles: &ColumnRoles,
    ) -> Result<Vec<FraudType>> {
        if outliers.is_empty() {
            return Ok(vec![FraudType::NoSuspiciousActivityDetected]);
        }

        let mut fraud_types = Vec::new();

        if let Some(column) = &roles.amount {
            if let Some(mean) = mean_amount(dataset, outliers, column)? {
                debug!(mean_amount = mean, "Outlier mean amount");
                if mean > self.config.laundering_mean_amount {
                    fraud_types.push(FraudType::MoneyLaundering);
                }
            }
        }

        if let Some(column) = &roles.timestamp {
            if let Some(span) = time_span_secs(dataset, outliers, column)? {
                debug!(span_secs = span, rows = outliers.len(), "Outlier time span");
                if span < self.config.embezzlement_window_secs
                    && outliers.len() > self.config.embezzlement_min_rows
                {
                    fraud_types.push(FraudType::Embezzlement);
                }
            }
        }

        if fraud_types.is_empty() {
            fraud_types.push(FraudType::SuspiciousActivity);
        }

        Ok(fraud_types)
    }
}

impl Default for FraudClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// Mean of the non-null amounts among `rows`; `None` when there are none
pub(crate) fn mean_amount(dataset: &Dataset, rows: &[usize], column: &str) -> Result<Option<f64>> {
    let Some(idx) = dataset.column_index(column) else {
        return Ok(None);
    };

    let mut sum = 0.0;
    let mut count = 0usize;
    for &row in rows {
        if let Some(values) = dataset.row(row) {
            if let Some(amount) = values[idx].as_amount(column)? {
                sum += amount;
                count += 1;
            }
        }
    }

    Ok((count > 0).then(|| sum / count as f64))
}

/// Seconds between the earliest and latest non-null timestamp among `rows`
fn time_span_secs(dataset: &Dataset, rows: &[usize], column: &str) -> Result<Option<i64>> {
    let Some(idx) = dataset.column_index(column) else {
        return Ok(None);
    };

    let mut earliest = None;
    let mut latest = None;
    for &row in rows {
        let Some(values) = dataset.row(row) else {
            continue;
        };
        if let Some(ts) = values[idx].as_timestamp(column)? {
            earliest = Some(earliest.map_or(ts, |e: chrono::NaiveDateTime| e.min(ts)));
            latest = Some(latest.map_or(ts, |l: chrono::NaiveDateTime| l.max(ts)));
        }
    }

    Ok(match (earliest, latest) {
        (Some(first), Some(last)) => Some((last - first).num_seconds()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::Value;

    fn roles(amount: bool, timestamp: bool) -> ColumnRoles {
        ColumnRoles {
            amount: amount.then(|| "amount".to_string()),
            timestamp: timestamp.then(|| "date".to_string()),
            entity: None,
        }
    }

    fn dataset(rows: &[(f64, &str)]) -> Dataset {
        Dataset::from_rows(
            ["amount", "date"],
            rows.iter()
                .map(|(amount, date)| vec![Value::from(*amount), Value::from(*date)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_outliers_short_circuit() {
        let data = dataset(&[(50_000.0, "2024-01-01 10:00:00")]);
        let types = FraudClassifier::default()
            .classify(&data, &[], &roles(true, true))
            .unwrap();
        assert_eq!(types, vec![FraudType::NoSuspiciousActivityDetected]);
    }

    #[test]
    fn test_money_laundering() {
        let data = dataset(&[
            (25_000.0, "2024-01-01 10:00:00"),
            (15_000.0, "2024-01-09 10:00:00"),
            (10.0, "2024-01-03 10:00:00"),
        ]);
        let types = FraudClassifier::default()
            .classify(&data, &[0, 1], &roles(true, true))
            .unwrap();
        assert_eq!(types, vec![FraudType::MoneyLaundering]);
    }

    #[test]
    fn test_mean_must_exceed_threshold() {
        let data = dataset(&[(10_000.0, "2024-01-01 10:00:00"), (10_000.0, "2024-01-05 10:00:00")]);
        let types = FraudClassifier::default()
            .classify(&data, &[0, 1], &roles(true, true))
            .unwrap();
        assert_eq!(types, vec![FraudType::SuspiciousActivity]);
    }

    #[test]
    fn test_embezzlement_needs_more_than_three_rows() {
        let rows = [
            (50.0, "2024-01-01 10:00:00"),
            (52.0, "2024-01-01 10:20:00"),
            (48.0, "2024-01-01 10:40:00"),
            (51.0, "2024-01-01 10:55:00"),
        ];
        let data = dataset(&rows);
        let classifier = FraudClassifier::default();

        let four = classifier.classify(&data, &[0, 1, 2, 3], &roles(true, true)).unwrap();
        assert_eq!(four, vec![FraudType::Embezzlement]);

        let three = classifier.classify(&data, &[0, 1, 2], &roles(true, true)).unwrap();
        assert_eq!(three, vec![FraudType::SuspiciousActivity]);
    }

    #[test]
    fn test_both_labels_in_rule_order() {
        let rows = [
            (90_000.0, "2024-01-01 10:00:00"),
            (80_000.0, "2024-01-01 11:00:00"),
            (70_000.0, "2024-01-01 12:00:00"),
            (60_000.0, "2024-01-01 13:00:00"),
        ];
        let types = FraudClassifier::default()
            .classify(&dataset(&rows), &[0, 1, 2, 3], &roles(true, true))
            .unwrap();
        assert_eq!(types, vec![FraudType::MoneyLaundering, FraudType::Embezzlement]);
    }

    #[test]
    fn test_rules_skip_unresolved_roles() {
        let rows = [
            (90_000.0, "2024-01-01 10:00:00"),
            (80_000.0, "2024-01-01 11:00:00"),
            (70_000.0, "2024-01-01 12:00:00"),
            (60_000.0, "2024-01-01 13:00:00"),
        ];
        let types = FraudClassifier::default()
            .classify(&dataset(&rows), &[0, 1, 2, 3], &roles(false, false))
            .unwrap();
        assert_eq!(types, vec![FraudType::SuspiciousActivity]);
    }

    #[test]
    fn test_null_amounts_are_ignored() {
        let data = Dataset::from_rows(
            ["amount"],
            vec![vec![Value::Null], vec![Value::from(30_000.0)]],
        )
        .unwrap();
        assert_eq!(mean_amount(&data, &[0, 1], "amount").unwrap(), Some(30_000.0));
        assert_eq!(mean_amount(&data, &[0], "amount").unwrap(), None);
    }
}
