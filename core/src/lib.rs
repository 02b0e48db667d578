//! Configuration model for the SQLite gateway module.
//!
//! This crate defines the declarative description of what the gateway
//! stores:
//!
//! - [`Configuration`]: the MAC tag plus an ordered list of sources.
//! - [`Source`]: one data feed bound to one table in one database file,
//!   with an optional row limit.
//! - [`Column`]: a typed, optionally key/not-null column.
//!
//! [`parse_configuration`] builds a [`Configuration`] from the JSON text
//! the gateway host hands to the module, and
//! [`validate_configuration`] reports cross-field issues.
//!
//! # Example
//!
//! ```
//! use sqlite_gateway_core::*;
//!
//! let config = parse_configuration(r#"{
//!     "macAddress": "aa:bb:cc:dd:ee:ff",
//!     "sources": [{"id": "s", "dbPath": "s.db", "table": "T", "limit": "0",
//!                  "columns": [{"name": "k", "type": "INT", "primaryKey": "1", "notNull": "1"}]}]
//! }"#).unwrap();
//!
//! assert_eq!(config.find_source("s").unwrap().table, "T");
//! assert!(validate_configuration(&config).is_empty());
//! ```

mod error;
mod parse;
mod types;
mod validate;

pub use error::{ConfigError, Result};
pub use parse::{parse_configuration, parse_leading_int};
pub use types::*;
pub use validate::{ValidationIssue, validate_configuration};
