//! Error types for configuration parsing.

use thiserror::Error;

/// Errors raised while turning configuration text into a
/// [`Configuration`](crate::Configuration).
///
/// Any of these aborts the whole parse; no partially built configuration
/// is ever handed back.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The text is not valid JSON, or a field has the wrong JSON type.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration root is not a JSON object.
    #[error("configuration must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("{location}: missing required field `{field}`")]
    MissingField {
        /// Where the field was expected, e.g. `sources[2].columns[0]`.
        location: String,
        /// JSON name of the missing field.
        field: &'static str,
    },

    /// A field is present but its value cannot be used.
    #[error("{location}: invalid value for `{field}`: {reason}")]
    InvalidField {
        location: String,
        field: &'static str,
        reason: String,
    },

    /// A source declares no columns.
    #[error("{0}: `columns` must contain at least one column")]
    EmptyColumns(String),

    /// Two sources share the same id.
    #[error("duplicate source id: {0}")]
    DuplicateSourceId(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
