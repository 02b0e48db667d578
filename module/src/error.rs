//! Error types for the gateway module.

use sqlite_gateway_core::ConfigError;
use sqlite_gateway_sqlite::StoreError;
use thiserror::Error;

/// Failure reported by a [`Broker`](crate::Broker).
#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct BrokerError(pub String);

/// Errors that can occur in the module lifecycle or while handling a
/// command.
///
/// Per-command errors never stop the module:
/// [`receive`](crate::GatewayModule::receive) logs them and moves on.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database for a command could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The message body is malformed or lacks a required field.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A peer module addressed a source id that is not configured.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// The result could not be published.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Convenience alias for results with [`ModuleError`].
pub type Result<T> = std::result::Result<T, ModuleError>;
