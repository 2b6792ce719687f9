//! Transaction Anomaly Report Library
//!
//! Flags anomalous rows in a table of financial transactions with an
//! isolation forest and turns them into an incident report: a fraud
//! category, per-row evidence and a remediation checklist.

pub mod classifier;
pub mod column_resolver;
pub mod config;
pub mod detector;
pub mod error;
pub mod feature_builder;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod recommendations;
pub mod summary;
pub mod types;

pub use column_resolver::{ColumnResolver, ColumnRoles};
pub use config::AppConfig;
pub use detector::FraudDetector;
pub use error::DetectionError;
pub use feature_builder::{FeatureBuilder, FeatureMatrix};
pub use models::{OutlierForest, OutlierModel};
pub use types::{
    dataset::{Dataset, Value},
    report::{DetectionResult, FraudType, IncidentReport, Recommendations, SummaryStats},
};
