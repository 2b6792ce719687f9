//! Configuration management for the anomaly report pipeline

use crate::error::DetectionError;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub columns: ColumnPatterns,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Isolation forest parameters, fixed for one detection run
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DetectionConfig {
    /// Number of trees in the ensemble
    #[serde(default = "default_tree_count")]
    pub tree_count: usize,
    /// Rows drawn (without replacement) to grow each tree
    #[serde(default = "default_subsample_size")]
    pub subsample_size: usize,
    /// Fraction of rows labelled as outliers, in (0, 1)
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Seed for every random choice the forest makes
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_tree_count() -> usize {
    100
}

fn default_subsample_size() -> usize {
    256
}

fn default_contamination() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

impl DetectionConfig {
    pub fn validate(&self) -> std::result::Result<(), DetectionError> {
        if self.tree_count == 0 {
            return Err(DetectionError::InvalidConfig(
                "tree_count must be at least 1".to_string(),
            ));
        }
        if self.subsample_size < 2 {
            return Err(DetectionError::InvalidConfig(format!(
                "subsample_size must be at least 2, got {}",
                self.subsample_size
            )));
        }
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(DetectionError::InvalidConfig(format!(
                "contamination must lie in (0, 1), got {}",
                self.contamination
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tree_count: default_tree_count(),
            subsample_size: default_subsample_size(),
            contamination: default_contamination(),
            seed: default_seed(),
        }
    }
}

/// Thresholds for the fraud taxonomy rules
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    /// Mean outlier amount above which laundering is reported
    #[serde(default = "default_laundering_mean_amount")]
    pub laundering_mean_amount: f64,
    /// Outliers packed into less than this span may indicate embezzlement
    #[serde(default = "default_embezzlement_window_secs")]
    pub embezzlement_window_secs: i64,
    /// Embezzlement needs strictly more outliers than this
    #[serde(default = "default_embezzlement_min_rows")]
    pub embezzlement_min_rows: usize,
}

fn default_laundering_mean_amount() -> f64 {
    10_000.0
}

fn default_embezzlement_window_secs() -> i64 {
    86_400
}

fn default_embezzlement_min_rows() -> usize {
    3
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            laundering_mean_amount: default_laundering_mean_amount(),
            embezzlement_window_secs: default_embezzlement_window_secs(),
            embezzlement_min_rows: default_embezzlement_min_rows(),
        }
    }
}

/// Ordered, case-sensitive column names tried for each role
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ColumnPatterns {
    #[serde(default = "default_amount_patterns")]
    pub amount: Vec<String>,
    #[serde(default = "default_timestamp_patterns")]
    pub timestamp: Vec<String>,
    #[serde(default = "default_entity_patterns")]
    pub entity: Vec<String>,
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_amount_patterns() -> Vec<String> {
    to_strings(&["amount", "amt", "value"])
}

fn default_timestamp_patterns() -> Vec<String> {
    to_strings(&["date", "time", "timestamp"])
}

fn default_entity_patterns() -> Vec<String> {
    to_strings(&["account", "user", "entity"])
}

impl Default for ColumnPatterns {
    fn default() -> Self {
        Self {
            amount: default_amount_patterns(),
            timestamp: default_timestamp_patterns(),
            entity: default_entity_patterns(),
        }
    }
}

/// Input file handling
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// File extensions the loader accepts (compared case-insensitively)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_allowed_extensions() -> Vec<String> {
    to_strings(&["csv", "json"])
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app.detection
            .validate()
            .context("Invalid detection configuration")?;

        Ok(app)
    }
}
