//! Outlier labelling on top of the isolation forest

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::feature_builder::FeatureMatrix;
use crate::metrics::DetectionMetrics;
use crate::models::isolation_forest::OutlierForest;
use crate::types::report::AnomalyLabel;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Score used for rows of a matrix that carries no information
const NEUTRAL_SCORE: f64 = 0.5;

/// Scores and labels for every row of one feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierScores {
    pub scores: Vec<f64>,
    pub labels: Vec<AnomalyLabel>,
}

impl OutlierScores {
    fn neutral(rows: usize) -> Self {
        Self {
            scores: vec![NEUTRAL_SCORE; rows],
            labels: vec![AnomalyLabel::Normal; rows],
        }
    }

    /// Indices of outlier rows, ascending
    pub fn outlier_indices(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.is_outlier())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn outlier_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_outlier()).count()
    }
}

/// Unsupervised outlier model, trained from scratch on every matrix it sees
pub struct OutlierModel {
    config: DetectionConfig,
    metrics: Option<Arc<DetectionMetrics>>,
}

impl OutlierModel {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<DetectionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Train a forest on `matrix`, score every row and label the top
    /// `contamination` fraction as outliers.
    ///
    /// A matrix with no rows or no columns yields no outliers.
    pub fn fit_predict(&self, matrix: &FeatureMatrix) -> OutlierScores {
        if matrix.is_degenerate() {
            warn!(
                rows = matrix.len(),
                width = matrix.width(),
                "Degenerate feature matrix, no anomalies detectable"
            );
            return OutlierScores::neutral(matrix.len());
        }

        let fit_start = Instant::now();
        let forest = OutlierForest::fit(matrix, &self.config);
        let fit_time = fit_start.elapsed();

        let score_start = Instant::now();
        let scores = forest.score_all(matrix);
        let score_time = score_start.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_stage("forest_fit", fit_time);
            metrics.record_stage("scoring", score_time);
        }

        let labels = label_outliers(&scores, self.config.contamination);

        debug!(
            trees = forest.tree_count(),
            sample_size = forest.sample_size(),
            fit_us = fit_time.as_micros() as u64,
            score_us = score_time.as_micros() as u64,
            "Isolation forest scored"
        );

        OutlierScores { scores, labels }
    }
}

/// Label the `round(contamination * n)` highest-scoring rows as outliers.
///
/// Rows are ranked by score with a stable sort, so ties at the cut-off go
/// to the earlier row. A row whose score equals the lowest score in the set
/// was never separated from the bulk and is not labelled, which leaves
/// fully uniform data without outliers.
pub fn label_outliers(scores: &[f64], contamination: f64) -> Vec<AnomalyLabel> {
    let mut labels = vec![AnomalyLabel::Normal; scores.len()];
    if scores.is_empty() {
        return labels;
    }

    let take = ((contamination * scores.len() as f64).round() as usize).min(scores.len());
    let floor = scores.iter().copied().fold(f64::INFINITY, f64::min);

    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    for &i in ranked.iter().take(take) {
        if scores[i] > floor {
            labels[i] = AnomalyLabel::Outlier;
        }
    }
    labels
}
