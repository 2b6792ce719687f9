//! Column role inference from column names

use crate::config::ColumnPatterns;
use serde::Serialize;
use tracing::debug;

/// Columns chosen for each role; any role may be unresolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub amount: Option<String>,
    pub timestamp: Option<String>,
    pub entity: Option<String>,
}

impl ColumnRoles {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.timestamp.is_none() && self.entity.is_none()
    }
}

/// Resolves column roles by exact, case-sensitive name match.
///
/// Patterns are tried in order and the first one naming an existing column
/// wins; there is no fuzzy or substring matching.
pub struct ColumnResolver {
    patterns: ColumnPatterns,
}

impl ColumnResolver {
    pub fn new(patterns: ColumnPatterns) -> Self {
        Self { patterns }
    }

    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> ColumnRoles {
        let roles = ColumnRoles {
            amount: find_column(columns, &self.patterns.amount),
            timestamp: find_column(columns, &self.patterns.timestamp),
            entity: find_column(columns, &self.patterns.entity),
        };

        debug!(
            amount = ?roles.amount,
            timestamp = ?roles.timestamp,
            entity = ?roles.entity,
            "Column roles resolved"
        );

        roles
    }
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new(ColumnPatterns::default())
    }
}

fn find_column<S: AsRef<str>>(columns: &[S], patterns: &[String]) -> Option<String> {
    patterns
        .iter()
        .find(|pattern| columns.iter().any(|c| c.as_ref() == pattern.as_str()))
        .cloned()
}
