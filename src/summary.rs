//! Aggregate figures for the incident report

use crate::classifier::mean_amount;
use crate::error::Result;
use crate::types::dataset::Dataset;
use crate::types::report::{DetectionResult, SummaryStats};
use rand::Rng;

/// Placeholder range for the geolocation risk stand-in (upper bound exclusive)
const GEO_RISK_RANGE: std::ops::Range<u32> = 30..90;
/// Placeholder range for the temporal-pattern stand-in (upper bound exclusive)
const TIME_SCORE_RANGE: std::ops::Range<u32> = 40..95;

pub struct SummaryStatsCalculator;

impl SummaryStatsCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Summarise the suspicious rows of a detection run.
    ///
    /// `geo_risk` and `time_score` are drawn from the thread RNG and change
    /// on every call.
    pub fn summarize(&self, dataset: &Dataset, result: &DetectionResult) -> Result<SummaryStats> {
        self.summarize_with_rng(dataset, result, &mut rand::thread_rng())
    }

    pub fn summarize_with_rng<R: Rng>(
        &self,
        dataset: &Dataset,
        result: &DetectionResult,
        rng: &mut R,
    ) -> Result<SummaryStats> {
        let rows: Vec<usize> = result.suspicious_rows.iter().map(|r| r.row_index).collect();

        let avg_amount = match &result.column_roles.amount {
            Some(column) if !rows.is_empty() => {
                mean_amount(dataset, &rows, column)?.map(round_cents)
            }
            _ => None,
        };

        Ok(SummaryStats {
            avg_amount,
            // TODO: replace both with real geolocation and temporal analyses
            geo_risk: rng.gen_range(GEO_RISK_RANGE),
            time_score: rng.gen_range(TIME_SCORE_RANGE),
        })
    }
}

impl Default for SummaryStatsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
