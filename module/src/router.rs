//! Inbound command classification and body parsing.
//!
//! | Path | Selector | Database | Result |
//! |---|---|---|---|
//! | Ingestion | `source == "mapping"` and no `deviceKey` | body `dbPath` | published |
//! | Peer module | no `source`; property named after the module tag holds a source id | the source's `db_path` | discarded |
//!
//! A `source` property always wins: a message carrying both `source` and
//! the module tag property is judged on `source` alone.

use serde::Deserialize;

use crate::error::{ModuleError, Result};
use crate::message::Message;
use crate::publisher::SOURCE_PROPERTY;

/// `source` value marking commands from the ingestion path.
pub const INGESTION_SOURCE: &str = "mapping";

/// Property marking device telemetry, which the ingestion path ignores.
pub const DEVICE_KEY_PROPERTY: &str = "deviceKey";

/// Which path an inbound message takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Privileged command naming its database; the result is published.
    Ingestion,
    /// Command from a peer module for the named source; fire-and-forget.
    Peer(&'a str),
    /// Not addressed to this module.
    Ignored,
}

/// Classifies a message by its properties.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_module::{Message, Route, classify};
///
/// let msg = Message::new("{}").with_property("source", "mapping");
/// assert_eq!(classify(&msg, "sqlite"), Route::Ingestion);
///
/// let msg = Message::new("{}").with_property("sqlite", "temperature");
/// assert_eq!(classify(&msg, "sqlite"), Route::Peer("temperature"));
/// ```
pub fn classify<'a>(message: &'a Message, module_tag: &str) -> Route<'a> {
    match message.property(SOURCE_PROPERTY) {
        Some(source) => {
            if source == INGESTION_SOURCE && !message.has_property(DEVICE_KEY_PROPERTY) {
                Route::Ingestion
            } else {
                Route::Ignored
            }
        }
        None => match message.property(module_tag) {
            Some(source_id) => Route::Peer(source_id),
            None => Route::Ignored,
        },
    }
}

/// JSON body of a command message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandBody {
    #[serde(rename = "dbPath")]
    pub db_path: Option<String>,
    #[serde(rename = "sqlCommand")]
    pub sql_command: Option<String>,
}

impl CommandBody {
    /// Parses a message body.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Protocol`] if the body is not a JSON object or
    /// a field is not a string.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(content)
            .map_err(|err| ModuleError::Protocol(format!("body is not valid JSON: {err}")))?;
        if !value.is_object() {
            return Err(ModuleError::Protocol("body is not a JSON object".to_string()));
        }
        serde_json::from_value(value)
            .map_err(|err| ModuleError::Protocol(format!("invalid command body: {err}")))
    }

    /// Returns `(dbPath, sqlCommand)` for an ingestion command.
    pub fn into_ingestion(self) -> Result<(String, String)> {
        let db_path = self
            .db_path
            .ok_or_else(|| ModuleError::Protocol("missing dbPath".to_string()))?;
        let sql = self
            .sql_command
            .ok_or_else(|| ModuleError::Protocol("missing sqlCommand".to_string()))?;
        Ok((db_path, sql))
    }

    /// Returns `sqlCommand` for a peer command.
    pub fn into_peer(self) -> Result<String> {
        self.sql_command
            .ok_or_else(|| ModuleError::Protocol("missing sqlCommand".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_requires_mapping_source() {
        let msg = Message::new("{}").with_property("source", "bleDevice");
        assert_eq!(classify(&msg, "sqlite"), Route::Ignored);
    }

    #[test]
    fn test_device_key_is_ignored() {
        let msg = Message::new("{}")
            .with_property("source", "mapping")
            .with_property("deviceKey", "abc");
        assert_eq!(classify(&msg, "sqlite"), Route::Ignored);
    }

    #[test]
    fn test_source_property_takes_precedence() {
        let msg = Message::new("{}")
            .with_property("source", "other")
            .with_property("sqlite", "temperature");
        assert_eq!(classify(&msg, "sqlite"), Route::Ignored);
    }

    #[test]
    fn test_no_routing_properties() {
        let msg = Message::new("{}").with_property("macAddress", "m");
        assert_eq!(classify(&msg, "sqlite"), Route::Ignored);
    }

    #[test]
    fn test_parse_ingestion_body() {
        let body = CommandBody::parse(br#"{"dbPath": "t.db", "sqlCommand": "select 1;"}"#).unwrap();
        assert_eq!(
            body.into_ingestion().unwrap(),
            ("t.db".to_string(), "select 1;".to_string())
        );
    }

    #[test]
    fn test_ingestion_body_missing_fields() {
        let body = CommandBody::parse(br#"{"sqlCommand": "select 1;"}"#).unwrap();
        assert!(matches!(body.into_ingestion(), Err(ModuleError::Protocol(_))));

        let body = CommandBody::parse(br#"{"dbPath": "t.db"}"#).unwrap();
        assert!(matches!(body.into_ingestion(), Err(ModuleError::Protocol(_))));
    }

    #[test]
    fn test_peer_body() {
        let body = CommandBody::parse(br#"{"sqlCommand": "insert into T values (1);"}"#).unwrap();
        assert_eq!(body.into_peer().unwrap(), "insert into T values (1);");

        let body = CommandBody::parse(b"{}").unwrap();
        assert!(matches!(body.into_peer(), Err(ModuleError::Protocol(_))));
    }

    #[test]
    fn test_malformed_bodies() {
        let bodies: [&[u8]; 4] = [b"not json", b"[1,2]", b"\"text\"", br#"{"sqlCommand": 5}"#];
        for content in bodies {
            assert!(
                matches!(CommandBody::parse(content), Err(ModuleError::Protocol(_))),
                "{}",
                String::from_utf8_lossy(content)
            );
        }
    }
}
