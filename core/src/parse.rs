//! JSON configuration parsing.
//!
//! The configuration format encodes `limit`, `primaryKey` and `notNull` as
//! strings and reads them with C `atoi` semantics: leading whitespace,
//! optional sign, leading digits, anything else ignored, and `0` when no
//! digits are present. Native JSON numbers and booleans are accepted too.
//!
//! # Example
//!
//! ```
//! use sqlite_gateway_core::parse_configuration;
//!
//! let config = parse_configuration(r#"{
//!     "macAddress": "01:02:03:03:02:01",
//!     "sources": [{
//!         "id": "temp",
//!         "dbPath": "edge.db",
//!         "table": "Temperature",
//!         "limit": "100",
//!         "columns": [
//!             {"name": "ts", "type": "CHAR(19)", "primaryKey": "1", "notNull": "1"},
//!             {"name": "value", "type": "REAL", "primaryKey": "0", "notNull": "0"}
//!         ]
//!     }]
//! }"#).unwrap();
//!
//! assert_eq!(config.sources[0].row_limit, 100);
//! assert!(config.sources[0].columns[0].primary_key);
//! ```

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::types::{Column, Configuration, Source};
use crate::validate::validate_configuration;

#[derive(Debug, Deserialize)]
struct RawConfiguration {
    #[serde(rename = "macAddress")]
    mac_address: Option<String>,
    sources: Option<Vec<RawSource>>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    id: Option<String>,
    #[serde(rename = "dbPath")]
    db_path: Option<String>,
    table: Option<String>,
    limit: Option<Scalar>,
    columns: Option<Vec<RawColumn>>,
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    name: Option<String>,
    #[serde(rename = "type")]
    sql_type: Option<String>,
    #[serde(rename = "primaryKey")]
    primary_key: Option<Scalar>,
    #[serde(rename = "notNull")]
    not_null: Option<Scalar>,
}

/// A loosely typed scalar field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl Scalar {
    fn as_int(&self) -> i64 {
        match self {
            Scalar::Text(text) => parse_leading_int(text),
            Scalar::Int(value) => *value,
            Scalar::Bool(flag) => i64::from(*flag),
        }
    }

    fn as_flag(&self) -> bool {
        self.as_int() == 1
    }
}

/// Parses an integer prefix the way C `atoi` does, saturating on overflow.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_core::parse_leading_int;
///
/// assert_eq!(parse_leading_int("  42abc"), 42);
/// assert_eq!(parse_leading_int("-7"), -7);
/// assert_eq!(parse_leading_int("yes"), 0);
/// ```
pub fn parse_leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(digit - b'0'));
    }
    if negative { -value } else { value }
}

fn required<T>(value: Option<T>, location: &str, field: &'static str) -> Result<T> {
    value.ok_or_else(|| ConfigError::MissingField {
        location: location.to_string(),
        field,
    })
}

/// Parses configuration text into a [`Configuration`].
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text is not a JSON object, if any
/// required field is missing at any level, if a source has no columns, or
/// if two sources share an id.
pub fn parse_configuration(json: &str) -> Result<Configuration> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject);
    }
    let raw: RawConfiguration = serde_json::from_value(value)?;

    let mac_address = required(raw.mac_address, "configuration", "macAddress")?;
    let raw_sources = required(raw.sources, "configuration", "sources")?;

    let sources = raw_sources
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| build_source(raw, &format!("sources[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    let config = Configuration {
        mac_address,
        sources,
    };

    for issue in validate_configuration(&config) {
        let message = issue.to_string();
        match issue.into_error() {
            Some(err) => return Err(err),
            None => warn!("{message}"),
        }
    }

    debug!(sources = config.sources.len(), "parsed configuration");
    Ok(config)
}

fn build_source(raw: RawSource, location: &str) -> Result<Source> {
    let id = required(raw.id, location, "id")?;
    let db_path = required(raw.db_path, location, "dbPath")?;
    let table = required(raw.table, location, "table")?;
    let limit = required(raw.limit, location, "limit")?.as_int();
    let raw_columns = required(raw.columns, location, "columns")?;

    if raw_columns.is_empty() {
        return Err(ConfigError::EmptyColumns(location.to_string()));
    }

    let row_limit = u64::try_from(limit).unwrap_or_else(|_| {
        warn!(source = %id, limit, "negative row limit, retention disabled");
        0
    });

    let columns = raw_columns
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| build_column(raw, &format!("{location}.columns[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(Source {
        id,
        db_path,
        table,
        row_limit,
        columns,
    })
}

fn build_column(raw: RawColumn, location: &str) -> Result<Column> {
    let name = required(raw.name, location, "name")?;
    let sql_type = required(raw.sql_type, location, "type")?;
    let primary_key = required(raw.primary_key, location, "primaryKey")?.as_flag();
    let not_null = required(raw.not_null, location, "notNull")?.as_flag();

    Ok(Column {
        name,
        sql_type,
        primary_key,
        not_null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "macAddress": "01:01:01:01:01:01",
            "sources": [
                {
                    "id": "temperature",
                    "dbPath": "edge.db",
                    "table": "Temperature",
                    "limit": "50",
                    "columns": [
                        {"name": "Timestamp", "type": "CHAR(19)", "primaryKey": "1", "notNull": "1"},
                        {"name": "Value", "type": "REAL", "primaryKey": "0", "notNull": "0"}
                    ]
                },
                {
                    "id": "events",
                    "dbPath": "events.db",
                    "table": "Events",
                    "limit": "0",
                    "columns": [
                        {"name": "Id", "type": "INTEGER", "primaryKey": "1", "notNull": "0"}
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn test_parse_complete() {
        let config = parse_configuration(sample_json()).unwrap();
        assert_eq!(config.mac_address, "01:01:01:01:01:01");
        assert_eq!(config.sources.len(), 2);

        let temp = &config.sources[0];
        assert_eq!(temp.id, "temperature");
        assert_eq!(temp.db_path, "edge.db");
        assert_eq!(temp.table, "Temperature");
        assert_eq!(temp.row_limit, 50);
        assert_eq!(temp.columns[0], Column::new("Timestamp", "CHAR(19)").primary_key().not_null());
        assert_eq!(temp.columns[1], Column::new("Value", "REAL"));

        assert_eq!(config.sources[1].row_limit, 0);
    }

    #[test]
    fn test_not_null_read_from_its_own_field() {
        let config = parse_configuration(sample_json()).unwrap();
        let id = &config.sources[1].columns[0];
        assert!(id.primary_key);
        assert!(!id.not_null);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("10"), 10);
        assert_eq!(parse_leading_int(" \t15"), 15);
        assert_eq!(parse_leading_int("+3"), 3);
        assert_eq!(parse_leading_int("-12x"), -12);
        assert_eq!(parse_leading_int("12.9"), 12);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int("-"), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_loose_flags() {
        let json = r#"{"macAddress": "m", "sources": [{"id": "a", "dbPath": "a.db", "table": "A",
            "limit": 5, "columns": [
                {"name": "x", "type": "INT", "primaryKey": true, "notNull": "true"},
                {"name": "y", "type": "INT", "primaryKey": "2", "notNull": 1}
            ]}]}"#;
        let config = parse_configuration(json).unwrap();
        let source = &config.sources[0];
        assert_eq!(source.row_limit, 5);
        assert!(source.columns[0].primary_key);
        assert!(!source.columns[0].not_null);
        assert!(!source.columns[1].primary_key);
        assert!(source.columns[1].not_null);
    }

    #[test]
    fn test_non_numeric_limit_falls_back_to_zero() {
        let json = sample_json().replace(r#""limit": "50""#, r#""limit": "lots""#);
        let config = parse_configuration(&json).unwrap();
        assert_eq!(config.sources[0].row_limit, 0);
    }

    #[test]
    fn test_negative_limit_disables_retention() {
        let json = sample_json().replace(r#""limit": "50""#, r#""limit": "-4""#);
        let config = parse_configuration(&json).unwrap();
        assert!(!config.sources[0].has_retention());
    }

    #[test]
    fn test_missing_limit_fails() {
        let json = sample_json().replace(r#""limit": "0","#, "");
        let err = parse_configuration(&json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { ref location, field: "limit" } if location == "sources[1]"
        ));
    }

    #[test]
    fn test_missing_source_fields_fail() {
        for field in ["id", "dbPath", "table"] {
            let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
            value["sources"][0].as_object_mut().unwrap().remove(field);
            let err = parse_configuration(&value.to_string()).unwrap_err();
            assert!(
                matches!(err, ConfigError::MissingField { field: f, .. } if f == field),
                "expected missing {field}, got {err}"
            );
        }
    }

    #[test]
    fn test_missing_column_fields_fail() {
        for field in ["name", "type", "primaryKey", "notNull"] {
            let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
            value["sources"][0]["columns"][1]
                .as_object_mut()
                .unwrap()
                .remove(field);
            let err = parse_configuration(&value.to_string()).unwrap_err();
            match err {
                ConfigError::MissingField { location, field: f } => {
                    assert_eq!(f, field);
                    assert_eq!(location, "sources[0].columns[1]");
                }
                other => panic!("expected missing {field}, got {other}"),
            }
        }
    }

    #[test]
    fn test_missing_columns_array_fails() {
        let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        value["sources"][1].as_object_mut().unwrap().remove("columns");
        let err = parse_configuration(&value.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "columns", .. }));
    }

    #[test]
    fn test_empty_columns_fails() {
        let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        value["sources"][1]["columns"] = serde_json::json!([]);
        let err = parse_configuration(&value.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyColumns(_)));
    }

    #[test]
    fn test_missing_root_fields_fail() {
        assert!(matches!(
            parse_configuration(r#"{"sources": []}"#).unwrap_err(),
            ConfigError::MissingField { field: "macAddress", .. }
        ));
        assert!(matches!(
            parse_configuration(r#"{"macAddress": "m"}"#).unwrap_err(),
            ConfigError::MissingField { field: "sources", .. }
        ));
    }

    #[test]
    fn test_empty_sources_is_valid() {
        let config = parse_configuration(r#"{"macAddress": "m", "sources": []}"#).unwrap();
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_not_json_fails() {
        assert!(matches!(
            parse_configuration("not json").unwrap_err(),
            ConfigError::Json(_)
        ));
        assert!(matches!(
            parse_configuration("[1, 2]").unwrap_err(),
            ConfigError::NotAnObject
        ));
    }

    #[test]
    fn test_wrong_field_type_fails() {
        let json = sample_json().replace(r#""table": "Events""#, r#""table": 7"#);
        assert!(matches!(
            parse_configuration(&json).unwrap_err(),
            ConfigError::Json(_)
        ));
    }

    #[test]
    fn test_duplicate_source_id_fails() {
        let json = sample_json().replace(r#""id": "events""#, r#""id": "temperature""#);
        assert!(matches!(
            parse_configuration(&json).unwrap_err(),
            ConfigError::DuplicateSourceId(id) if id == "temperature"
        ));
    }
}
