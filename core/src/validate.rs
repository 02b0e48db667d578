//! Configuration validation.
//!
//! Checks cross-field invariants that the per-field parser cannot see:
//! source id uniqueness, column name uniqueness, and retention on tables
//! without a primary key.

use std::collections::HashSet;

use thiserror::Error;

use crate::error::ConfigError;
use crate::types::Configuration;

/// Problems found in an otherwise well-formed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    /// Two sources share an id, so routing would be ambiguous.
    #[error("duplicate source id: {0}")]
    DuplicateSourceId(String),
    /// Two columns of one source share a name; table creation will fail.
    #[error("source {source_id}: duplicate column {column}")]
    DuplicateColumn { source_id: String, column: String },
    /// Retention is requested but no column is a primary key; the table is
    /// created without a PRIMARY KEY clause and trimmed by rowid.
    #[error("source {0}: row limit set without a primary key, retention uses rowid order")]
    RetentionWithoutPrimaryKey(String),
}

impl ValidationIssue {
    /// Returns `true` if the issue must abort parsing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationIssue::DuplicateSourceId(_))
    }

    /// Converts a fatal issue into the error that aborts parsing; `None`
    /// for issues that are only warned about.
    pub fn into_error(self) -> Option<ConfigError> {
        match self {
            ValidationIssue::DuplicateSourceId(id) => Some(ConfigError::DuplicateSourceId(id)),
            ValidationIssue::DuplicateColumn { .. } | ValidationIssue::RetentionWithoutPrimaryKey(_) => None,
        }
    }
}

/// Validates a configuration, returning every issue found.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_core::*;
///
/// let config = Configuration {
///     mac_address: "m".into(),
///     sources: vec![
///         Source::new("a", "a.db", "A").with_column(Column::new("x", "INT")),
///         Source::new("a", "b.db", "B").with_column(Column::new("x", "INT")),
///     ],
/// };
/// let issues = validate_configuration(&config);
/// assert!(issues.iter().any(|i| i.is_fatal()));
/// ```
pub fn validate_configuration(config: &Configuration) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut ids = HashSet::new();

    for source in &config.sources {
        if !ids.insert(source.id.as_str()) {
            issues.push(ValidationIssue::DuplicateSourceId(source.id.clone()));
        }

        let mut names = HashSet::new();
        for column in &source.columns {
            if !names.insert(column.name.as_str()) {
                issues.push(ValidationIssue::DuplicateColumn {
                    source_id: source.id.clone(),
                    column: column.name.clone(),
                });
            }
        }

        if source.has_retention() && source.primary_key_columns().next().is_none() {
            issues.push(ValidationIssue::RetentionWithoutPrimaryKey(source.id.clone()));
        }
    }

    issues
}
