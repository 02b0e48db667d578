//! Gateway module exposing SQLite tables to the message bus.
//!
//! At start the module announces itself and provisions every configured
//! source (table plus optional retention trigger). Afterwards it serves two
//! kinds of commands:
//!
//! - **Ingestion** commands (`source = "mapping"`) name their database file
//!   and get their result published back as JSON.
//! - **Peer** commands (property `sqlite = <source id>`) run against a
//!   configured source; the result is discarded.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sqlite_gateway_module::{Dispatch, GatewayModule, MemoryBroker, Message, SqliteModule};
//!
//! let dir = std::env::temp_dir().join("sqlite_gateway_lib_doc");
//! std::fs::create_dir_all(&dir).unwrap();
//! let db = dir.join("readings.db");
//! let config = format!(
//!     r#"{{"macAddress": "m", "sources": [{{"id": "temp", "dbPath": "{}", "table": "T",
//!         "limit": "0", "columns": [{{"name": "id", "type": "INTEGER", "primaryKey": "1", "notNull": "0"}}]}}]}}"#,
//!     db.display()
//! );
//!
//! let broker = Arc::new(MemoryBroker::new());
//! let config = SqliteModule::<Arc<MemoryBroker>>::parse_configuration(&config).unwrap();
//! let mut module = SqliteModule::create(Arc::clone(&broker), config).unwrap();
//! module.start();
//!
//! let insert = Message::new(r#"{"sqlCommand": "INSERT INTO T VALUES (1);"}"#)
//!     .with_property("sqlite", "temp");
//! assert!(matches!(module.handle(&insert).unwrap(), Dispatch::Executed(_)));
//! module.destroy();
//! # std::fs::remove_dir_all(dir).ok();
//! ```

mod broker;
mod error;
mod message;
mod module;
mod publisher;
mod router;

pub use broker::{Broker, MemoryBroker};
pub use error::{BrokerError, ModuleError, Result};
pub use message::Message;
pub use module::{Dispatch, GatewayModule, SqliteModule};
pub use publisher::{MAC_ADDRESS_PROPERTY, ONLINE_NOTICE, Publisher, SOURCE_PROPERTY};
pub use router::{CommandBody, DEVICE_KEY_PROPERTY, INGESTION_SOURCE, Route, classify};
