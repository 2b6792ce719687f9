//! Timing and volume statistics for detection runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Samples kept per history before the oldest half is dropped
const HISTORY_LIMIT: usize = 1000;

/// Metrics collector shared by the detector and the outlier model
pub struct DetectionMetrics {
    /// Completed detection runs
    pub runs: AtomicU64,
    /// Rows analysed across all runs
    pub rows_analyzed: AtomicU64,
    /// Outliers flagged across all runs
    pub outliers_flagged: AtomicU64,
    /// Stage durations (in microseconds), keyed by stage name
    stage_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Feature matrix width per run
    feature_widths: RwLock<Vec<usize>>,
}

impl DetectionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            runs: AtomicU64::new(0),
            rows_analyzed: AtomicU64::new(0),
            outliers_flagged: AtomicU64::new(0),
            stage_times: RwLock::new(HashMap::new()),
            feature_widths: RwLock::new(Vec::new()),
        }
    }

    /// Record a finished run
    pub fn record_run(&self, rows: usize, outliers: usize, feature_width: usize, total: Duration) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.rows_analyzed.fetch_add(rows as u64, Ordering::Relaxed);
        self.outliers_flagged.fetch_add(outliers as u64, Ordering::Relaxed);

        if let Ok(mut widths) = self.feature_widths.write() {
            widths.push(feature_width);
            if widths.len() > HISTORY_LIMIT {
                widths.drain(0..HISTORY_LIMIT / 2);
            }
        }
        self.record_stage("total", total);
    }

    /// Record the duration of one pipeline stage
    pub fn record_stage(&self, stage: &str, duration: Duration) {
        if let Ok(mut times) = self.stage_times.write() {
            let stage_times = times.entry(stage.to_string()).or_default();
            stage_times.push(duration.as_micros() as u64);
            // Keep only the most recent samples per stage
            if stage_times.len() > HISTORY_LIMIT {
                stage_times.drain(0..HISTORY_LIMIT / 2);
            }
        }
    }

    /// Per-stage timing statistics
    pub fn stage_stats(&self) -> HashMap<String, StageStats> {
        let Ok(times) = self.stage_times.read() else {
            return HashMap::new();
        };

        times
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(stage, stage_times)| {
                let mut sorted = stage_times.clone();
                sorted.sort_unstable();
                let count = sorted.len();
                let sum: u64 = sorted.iter().sum();
                (
                    stage.clone(),
                    StageStats {
                        calls: count as u64,
                        mean_us: sum / count as u64,
                        p50_us: sorted[count / 2],
                        max_us: sorted[count - 1],
                    },
                )
            })
            .collect()
    }

    /// Fraction of analysed rows flagged as outliers
    pub fn outlier_rate(&self) -> f64 {
        let rows = self.rows_analyzed.load(Ordering::Relaxed);
        if rows == 0 {
            return 0.0;
        }
        self.outliers_flagged.load(Ordering::Relaxed) as f64 / rows as f64
    }

    /// Mean feature matrix width over recent runs
    pub fn mean_feature_width(&self) -> f64 {
        match self.feature_widths.read() {
            Ok(widths) if !widths.is_empty() => {
                widths.iter().sum::<usize>() as f64 / widths.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let runs = self.runs.load(Ordering::Relaxed);
        let rows = self.rows_analyzed.load(Ordering::Relaxed);
        let outliers = self.outliers_flagged.load(Ordering::Relaxed);

        info!(
            runs,
            rows,
            outliers,
            outlier_rate = format!("{:.1}%", self.outlier_rate() * 100.0),
            mean_feature_width = self.mean_feature_width(),
            "Detection summary"
        );

        let mut stages: Vec<(String, StageStats)> = self.stage_stats().into_iter().collect();
        stages.sort_by(|a, b| a.0.cmp(&b.0));
        for (stage, stats) in &stages {
            info!(
                stage = %stage,
                calls = stats.calls,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                max_us = stats.max_us,
                "Stage timing"
            );
        }
    }
}

impl Default for DetectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage timing statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_recording() {
        let metrics = DetectionMetrics::new();

        metrics.record_run(100, 10, 4, Duration::from_micros(300));
        metrics.record_run(50, 5, 2, Duration::from_micros(100));

        assert_eq!(metrics.runs.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rows_analyzed.load(Ordering::Relaxed), 150);
        assert!((metrics.outlier_rate() - 0.1).abs() < 1e-12);
        assert_eq!(metrics.mean_feature_width(), 3.0);
    }

    #[test]
    fn test_stage_stats() {
        let metrics = DetectionMetrics::new();
        for us in [100, 200, 600] {
            metrics.record_stage("features", Duration::from_micros(us));
        }

        let stats = metrics.stage_stats();
        let features = &stats["features"];
        assert_eq!(features.calls, 3);
        assert_eq!(features.mean_us, 300);
        assert_eq!(features.p50_us, 200);
        assert_eq!(features.max_us, 600);
    }

    #[test]
    fn test_histories_are_bounded() {
        let metrics = DetectionMetrics::new();
        for i in 0..=HISTORY_LIMIT {
            let width = if i < HISTORY_LIMIT / 2 { 1 } else { 3 };
            metrics.record_run(10, 1, width, Duration::from_micros(50));
        }

        assert_eq!(metrics.runs.load(Ordering::Relaxed), HISTORY_LIMIT as u64 + 1);
        assert_eq!(metrics.feature_widths.read().unwrap().len(), HISTORY_LIMIT / 2 + 1);
        assert_eq!(metrics.mean_feature_width(), 3.0);
        assert_eq!(metrics.stage_stats()["total"].calls, HISTORY_LIMIT as u64 / 2 + 1);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = DetectionMetrics::new();
        assert_eq!(metrics.outlier_rate(), 0.0);
        assert!(metrics.stage_stats().is_empty());
    }
}
