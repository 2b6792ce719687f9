//! Detection results, action plans and the incident report

use crate::column_resolver::ColumnRoles;
use crate::error::Result;
use crate::types::dataset::{Dataset, Value};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Fraud taxonomy assigned to a set of outliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudType {
    NoSuspiciousActivityDetected,
    MoneyLaundering,
    Embezzlement,
    SuspiciousActivity,
}

impl FraudType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudType::NoSuspiciousActivityDetected => "no_suspicious_activity_detected",
            FraudType::MoneyLaundering => "money_laundering",
            FraudType::Embezzlement => "embezzlement",
            FraudType::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl fmt::Display for FraudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outlier flag attached to every row: -1 for outliers, 1 for normal rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyLabel {
    Outlier,
    Normal,
}

impl AnomalyLabel {
    pub fn as_i8(&self) -> i8 {
        match self {
            AnomalyLabel::Outlier => -1,
            AnomalyLabel::Normal => 1,
        }
    }

    pub fn is_outlier(&self) -> bool {
        matches!(self, AnomalyLabel::Outlier)
    }
}

impl Serialize for AnomalyLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

/// A flagged row together with its anomaly score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspiciousRow {
    /// Position of the row in the input dataset
    pub row_index: usize,
    /// Normalised isolation score in (0, 1]; higher is more anomalous
    pub anomaly_score: f64,
    pub anomaly: AnomalyLabel,
    /// Original column values
    pub values: BTreeMap<String, Value>,
}

/// Outcome of one detection run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Ordered, de-duplicated fraud labels; never empty
    pub fraud_types: Vec<FraudType>,
    /// Outlier rows in original row order
    pub suspicious_rows: Vec<SuspiciousRow>,
    /// Columns the run resolved for each role
    pub column_roles: ColumnRoles,
    /// Score and label of every row, index-aligned with the dataset
    #[serde(skip)]
    pub row_scores: Vec<(f64, AnomalyLabel)>,
}

impl DetectionResult {
    pub fn has_fraud_type(&self, fraud_type: FraudType) -> bool {
        self.fraud_types.contains(&fraud_type)
    }

    /// Copy of `dataset` with `anomaly_score` and `anomaly` columns appended
    pub fn annotate(&self, dataset: &Dataset) -> Result<Dataset> {
        let scores = self
            .row_scores
            .iter()
            .map(|(score, _)| Value::Number(*score))
            .collect();
        let labels = self
            .row_scores
            .iter()
            .map(|(_, label)| Value::Number(label.as_i8() as f64))
            .collect();
        dataset.with_columns(&["anomaly_score", "anomaly"], vec![scores, labels])
    }
}

/// Urgency of a remediation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
}

/// One remediation step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItem {
    pub title: String,
    pub description: String,
    pub deadline: String,
    pub priority: Priority,
    pub responsible: String,
}

impl ActionItem {
    pub fn new(
        title: &str,
        description: &str,
        deadline: &str,
        priority: Priority,
        responsible: &str,
    ) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            deadline: deadline.to_string(),
            priority,
            responsible: responsible.to_string(),
        }
    }
}

/// Remediation plan grouped by phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub immediate: Vec<ActionItem>,
    pub investigation: Vec<ActionItem>,
    pub prevention: Vec<ActionItem>,
}

impl Recommendations {
    /// All actions, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = &ActionItem> {
        self.immediate
            .iter()
            .chain(&self.investigation)
            .chain(&self.prevention)
    }

    pub fn len(&self) -> usize {
        self.immediate.len() + self.investigation.len() + self.prevention.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregate figures describing the suspicious subset.
///
/// `geo_risk` and `time_score` are randomised placeholders for geolocation
/// and temporal-pattern analyses that do not exist yet. They are not risk
/// scores and differ between runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    /// Mean amount over suspicious rows, 2 decimals; `None` when undefined
    pub avg_amount: Option<f64>,
    pub geo_risk: u32,
    pub time_score: u32,
}

/// Everything the rendering shell needs for one submitted dataset
#[derive(Debug, Clone, Serialize)]
pub struct IncidentReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub rows_analyzed: usize,
    pub fraud_types: Vec<FraudType>,
    pub suspicious_rows: Vec<SuspiciousRow>,
    pub recommendations: Recommendations,
    pub summary: SummaryStats,
}

impl IncidentReport {
    pub fn new(
        rows_analyzed: usize,
        result: DetectionResult,
        recommendations: Recommendations,
        summary: SummaryStats,
    ) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            rows_analyzed,
            fraud_types: result.fraud_types,
            suspicious_rows: result.suspicious_rows,
            recommendations,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_type_serialization() {
        let json = serde_json::to_string(&vec![
            FraudType::NoSuspiciousActivityDetected,
            FraudType::MoneyLaundering,
        ])
        .unwrap();
        assert_eq!(json, r#"["no_suspicious_activity_detected","money_laundering"]"#);
        assert_eq!(FraudType::Embezzlement.to_string(), "embezzlement");
    }

    #[test]
    fn test_anomaly_label_serializes_as_sign() {
        let json = serde_json::to_string(&vec![AnomalyLabel::Outlier, AnomalyLabel::Normal]).unwrap();
        assert_eq!(json, "[-1,1]");
    }

    #[test]
    fn test_annotate_appends_anomaly_columns() {
        let dataset = Dataset::from_rows(
            ["amount"],
            vec![vec![Value::from(10.0)], vec![Value::from(9000.0)]],
        )
        .unwrap();
        let result = DetectionResult {
            fraud_types: vec![FraudType::SuspiciousActivity],
            suspicious_rows: Vec::new(),
            column_roles: ColumnRoles::default(),
            row_scores: vec![(0.4, AnomalyLabel::Normal), (0.8, AnomalyLabel::Outlier)],
        };

        let annotated = result.annotate(&dataset).unwrap();
        assert_eq!(annotated.columns(), &["amount", "anomaly_score", "anomaly"]);
        assert_eq!(
            annotated.row(1).unwrap(),
            &[Value::from(9000.0), Value::from(0.8), Value::from(-1.0)]
        );
    }

    #[test]
    fn test_summary_serializes_missing_average_as_null() {
        let stats = SummaryStats {
            avg_amount: None,
            geo_risk: 42,
            time_score: 60,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["avg_amount"].is_null());
        assert_eq!(json["geo_risk"], 42);
    }

    #[test]
    fn test_incident_report_id_is_uuid_string() {
        let result = DetectionResult {
            fraud_types: vec![FraudType::NoSuspiciousActivityDetected],
            suspicious_rows: Vec::new(),
            column_roles: ColumnRoles::default(),
            row_scores: Vec::new(),
        };
        let recommendations = Recommendations {
            immediate: Vec::new(),
            investigation: Vec::new(),
            prevention: Vec::new(),
        };
        let summary = SummaryStats {
            avg_amount: None,
            geo_risk: 30,
            time_score: 40,
        };
        let report = IncidentReport::new(12, result, recommendations, summary);

        let id = uuid::Uuid::parse_str(&report.report_id).unwrap();
        assert_eq!(id.get_version_num(), 4);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["report_id"], report.report_id.as_str());
        assert_eq!(json["rows_analyzed"], 12);
    }
}
