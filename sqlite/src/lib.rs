//! SQLite backend for the gateway module.
//!
//! This crate turns [`Source`](sqlite_gateway_core::Source) definitions
//! into tables with optional row-count retention, keeps the single open
//! database connection, and executes command SQL into result documents.
//!
//! # Architecture
//!
//! - **`schema`**: `CREATE TABLE` and retention trigger SQL generation
//! - **`provision`**: idempotent startup provisioning with failure reports
//! - **`connection`**: the [`ConnectionCache`] seam and its single-slot
//!   implementation
//! - **`exec`**: verbatim execution into a [`ResultDocument`]
//!
//! # Quick start
//!
//! ```no_run
//! use sqlite_gateway_core::{Column, Source};
//! use sqlite_gateway_sqlite::{ConnectionCache, Provisioner, SingleConnection, execute};
//!
//! let source = Source::new("temp", "edge.db", "Temperature")
//!     .with_row_limit(1000)
//!     .with_column(Column::new("ts", "CHAR(19)").primary_key().not_null())
//!     .with_column(Column::new("value", "REAL"));
//!
//! let mut cache = SingleConnection::new();
//! Provisioner::new(&mut cache).provision(&source);
//!
//! let conn = cache.ensure_open(source.path()).unwrap();
//! let doc = execute(conn, "SELECT * FROM Temperature;");
//! println!("{}", doc.to_json_pretty());
//! ```

mod connection;
mod error;
mod exec;
mod provision;
pub mod schema;

pub use connection::{ConnectionCache, SingleConnection};
pub use error::{Result, StoreError};
pub use exec::{NULL_TEXT, ResultDocument, ResultRow, execute};
pub use provision::{ProvisionFailure, ProvisionReport, Provisioner};
