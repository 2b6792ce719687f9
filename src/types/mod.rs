//! Type definitions for the detection core

pub mod dataset;
pub mod report;

pub use dataset::{Dataset, Value, ValueKind};
pub use report::{
    ActionItem, AnomalyLabel, DetectionResult, FraudType, IncidentReport, Priority,
    Recommendations, SummaryStats, SuspiciousRow,
};
