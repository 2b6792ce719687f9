//! Error types for the detection core

use thiserror::Error;

/// Errors that abort a detection run.
///
/// Everything else (missing column roles, an empty outlier set, a
/// degenerate feature matrix) degrades gracefully instead of erroring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// A column holds values the pipeline cannot interpret.
    #[error("Data format error in column '{column}': {reason}")]
    DataFormat { column: String, reason: String },

    /// Too few rows to train an outlier model.
    #[error("Insufficient data: {rows} row(s) supplied, at least 2 required")]
    InsufficientData { rows: usize },

    /// Detection parameters outside their valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DetectionError {
    pub fn data_format(column: impl Into<String>, reason: impl Into<String>) -> Self {
        DetectionError::DataFormat {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_format_names_column() {
        let err = DetectionError::data_format("date", "cannot parse 'yesterday' as a timestamp");
        let msg = err.to_string();
        assert!(msg.contains("'date'"));
        assert!(msg.contains("yesterday"));
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = DetectionError::InsufficientData { rows: 1 };
        assert_eq!(
            err.to_string(),
            "Insufficient data: 1 row(s) supplied, at least 2 required"
        );
    }
}
