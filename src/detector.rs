//! End-to-end detection pipeline.
//!
//! `detect` runs column resolution, feature construction, the isolation
//! forest and fraud classification over one dataset. `recommend` and
//! `summarize` turn its result into the remaining report sections, and
//! `analyze` runs all three in order.

use crate::classifier::FraudClassifier;
use crate::column_resolver::ColumnResolver;
use crate::config::{AppConfig, DetectionConfig};
use crate::error::{DetectionError, Result};
use crate::feature_builder::FeatureBuilder;
use crate::metrics::DetectionMetrics;
use crate::models::outlier::OutlierModel;
use crate::recommendations::RecommendationEngine;
use crate::summary::SummaryStatsCalculator;
use crate::types::dataset::Dataset;
use crate::types::report::{
    DetectionResult, FraudType, IncidentReport, Recommendations, SummaryStats, SuspiciousRow,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Minimum number of rows a dataset needs to be scored
const MIN_ROWS: usize = 2;

/// Stateless fraud detector; every call trains its own model
pub struct FraudDetector {
    detection: DetectionConfig,
    resolver: ColumnResolver,
    builder: FeatureBuilder,
    classifier: FraudClassifier,
    engine: RecommendationEngine,
    summary: SummaryStatsCalculator,
    metrics: Option<Arc<DetectionMetrics>>,
}

impl FraudDetector {
    /// Create a detector from application configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.detection.validate()?;

        info!(
            trees = config.detection.tree_count,
            subsample_size = config.detection.subsample_size,
            contamination = config.detection.contamination,
            seed = config.detection.seed,
            "Fraud detector initialized"
        );

        Ok(Self {
            detection: config.detection.clone(),
            resolver: ColumnResolver::new(config.columns.clone()),
            builder: FeatureBuilder::new(),
            classifier: FraudClassifier::new(config.classifier.clone()),
            engine: RecommendationEngine::new(),
            summary: SummaryStatsCalculator::new(),
            metrics: None,
        })
    }

    /// Create a detector with default settings apart from the forest parameters
    pub fn with_detection_config(detection: DetectionConfig) -> Result<Self> {
        Self::new(&AppConfig {
            detection,
            ..AppConfig::default()
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<DetectionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn detection_config(&self) -> &DetectionConfig {
        &self.detection
    }

    /// Flag anomalous rows and classify them.
    ///
    /// Fails with `InsufficientData` below two rows and with `DataFormat`
    /// when a column mixes value kinds, the amount column is not numeric or
    /// a timestamp cannot be parsed.
    pub fn detect(&self, dataset: &Dataset) -> Result<DetectionResult> {
        let start = Instant::now();

        if dataset.len() < MIN_ROWS {
            return Err(DetectionError::InsufficientData {
                rows: dataset.len(),
            });
        }
        dataset.validate_column_kinds()?;

        let roles = self.resolver.resolve(dataset.columns());

        let feature_start = Instant::now();
        let matrix = self.builder.build(dataset, &roles)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_stage("features", feature_start.elapsed());
        }

        let mut model = OutlierModel::new(self.detection.clone())?;
        if let Some(metrics) = &self.metrics {
            model = model.with_metrics(metrics.clone());
        }
        let scores = model.fit_predict(&matrix);
        let outliers = scores.outlier_indices();

        let fraud_types = self.classifier.classify(dataset, &outliers, &roles)?;

        let suspicious_rows: Vec<SuspiciousRow> = outliers
            .iter()
            .filter_map(|&i| {
                dataset.record(i).map(|values| SuspiciousRow {
                    row_index: i,
                    anomaly_score: scores.scores[i],
                    anomaly: scores.labels[i],
                    values,
                })
            })
            .collect();

        let elapsed = start.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.record_run(dataset.len(), outliers.len(), matrix.width(), elapsed);
        }

        info!(
            rows = dataset.len(),
            features = matrix.width(),
            outliers = outliers.len(),
            fraud_types = ?fraud_types,
            elapsed_us = elapsed.as_micros() as u64,
            "Detection complete"
        );

        Ok(DetectionResult {
            fraud_types,
            suspicious_rows,
            column_roles: roles,
            row_scores: scores.scores.into_iter().zip(scores.labels).collect(),
        })
    }

    /// Remediation plan for a set of fraud labels
    pub fn recommend(&self, fraud_types: &[FraudType]) -> Recommendations {
        let plan = self.engine.recommend(fraud_types);
        debug!(actions = plan.len(), "Recommendations generated");
        plan
    }

    /// Aggregate figures over the suspicious rows of `result`
    pub fn summarize(&self, dataset: &Dataset, result: &DetectionResult) -> Result<SummaryStats> {
        self.summary.summarize(dataset, result)
    }

    /// Run `detect`, `recommend` and `summarize` and assemble the report
    pub fn analyze(&self, dataset: &Dataset) -> Result<IncidentReport> {
        let result = self.detect(dataset)?;
        let recommendations = self.recommend(&result.fraud_types);
        let summary = self.summarize(dataset, &result)?;
        Ok(IncidentReport::new(
            dataset.len(),
            result,
            recommendations,
            summary,
        ))
    }
}
