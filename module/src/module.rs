//! Module lifecycle and command handling.
//!
//! The gateway host drives a module through [`GatewayModule`]:
//! `parse_configuration` → `create` → `start` → `receive`* → `destroy`.
//! Processing is synchronous; each command is resolved, executed and
//! (on the ingestion path) published before `receive` returns.

use std::path::Path;

use sqlite_gateway_core::{Configuration, MODULE_TAG, Source, find_source, parse_configuration};
use sqlite_gateway_sqlite::{
    ConnectionCache, ProvisionReport, Provisioner, ResultDocument, SingleConnection, execute,
};
use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::error::{ModuleError, Result};
use crate::message::Message;
use crate::publisher::Publisher;
use crate::router::{CommandBody, Route, classify};

/// Lifecycle contract between the gateway host and a module.
pub trait GatewayModule: Sized {
    /// Parsed configuration handed to [`create`](Self::create).
    type Configuration;
    /// Bus the module publishes to.
    type Broker;

    /// Parses the module's JSON configuration.
    fn parse_configuration(text: &str) -> Result<Self::Configuration>;

    /// Releases a configuration that will not be passed to `create`.
    fn free_configuration(configuration: Self::Configuration) {
        drop(configuration);
    }

    /// Builds the module, taking ownership of the configuration.
    fn create(broker: Self::Broker, configuration: Self::Configuration) -> Result<Self>;

    /// Called once before the first message.
    fn start(&mut self);

    /// Handles one inbound message. Never fails; problems are logged.
    fn receive(&mut self, message: &Message);

    /// Shuts the module down and releases its resources.
    fn destroy(self);
}

/// What [`SqliteModule::handle`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Ingestion command: executed and the document published.
    Published(ResultDocument),
    /// Peer command: executed, document not published.
    Executed(ResultDocument),
    /// Message not addressed to this module.
    Ignored,
}

/// The SQLite gateway module.
///
/// Owns the configured sources, the connection cache and the publisher.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sqlite_gateway_module::{GatewayModule, MemoryBroker, Message, SqliteModule};
///
/// let config = SqliteModule::<Arc<MemoryBroker>>::parse_configuration(
///     r#"{"macAddress": "01:02:03:04:05:06", "sources": []}"#,
/// ).unwrap();
/// let broker = Arc::new(MemoryBroker::new());
/// let mut module = SqliteModule::create(Arc::clone(&broker), config).unwrap();
/// module.start();
/// assert_eq!(broker.len(), 1); // online notice
///
/// let db = std::env::temp_dir().join("sqlite_gateway_doc.db");
/// let body = format!(r#"{{"dbPath": "{}", "sqlCommand": "SELECT 1 AS one;"}}"#, db.display());
/// module.receive(&Message::new(body).with_property("source", "mapping"));
/// assert_eq!(broker.len(), 2);
/// module.destroy();
/// # std::fs::remove_file(db).ok();
/// ```
pub struct SqliteModule<B, C = SingleConnection> {
    publisher: Publisher<B>,
    sources: Vec<Source>,
    cache: C,
}

impl<B: Broker, C: ConnectionCache> SqliteModule<B, C> {
    /// Builds a module around a caller-supplied connection cache.
    pub fn with_cache(broker: B, configuration: Configuration, cache: C) -> Self {
        let Configuration {
            mac_address,
            sources,
        } = configuration;
        info!(sources = sources.len(), %mac_address, "creating sqlite module");
        Self {
            publisher: Publisher::new(broker, mac_address),
            sources,
            cache,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn mac_address(&self) -> &str {
        self.publisher.mac_address()
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Publishes the online notice, then provisions every source.
    pub fn start_with_report(&mut self) -> ProvisionReport {
        if let Err(err) = self.publisher.publish_online() {
            error!(error = %err, "unable to publish online notice");
        }
        Provisioner::new(&mut self.cache).provision_all(&self.sources)
    }

    /// Routes and executes one message, reporting what happened.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Protocol`] for malformed bodies,
    /// [`ModuleError::UnknownSource`] for peer commands naming an
    /// unconfigured source, [`ModuleError::Store`] when the database cannot
    /// be opened, and [`ModuleError::Broker`] when publishing fails. SQL
    /// errors are not errors here: they are part of the returned document.
    pub fn handle(&mut self, message: &Message) -> Result<Dispatch> {
        match classify(message, MODULE_TAG) {
            Route::Ingestion => {
                let (db_path, sql) = CommandBody::parse(message.content())?.into_ingestion()?;
                debug!(db_path = %db_path, "ingestion command");
                let conn = self.cache.ensure_open(Path::new(&db_path))?;
                let document = execute(conn, &sql);
                self.publisher.publish_document(&document)?;
                Ok(Dispatch::Published(document))
            }
            Route::Peer(source_id) => {
                let source = find_source(&self.sources, source_id)
                    .ok_or_else(|| ModuleError::UnknownSource(source_id.to_string()))?;
                let sql = CommandBody::parse(message.content())?.into_peer()?;
                debug!(source = %source.id, "peer command");
                let conn = self.cache.ensure_open(source.path())?;
                Ok(Dispatch::Executed(execute(conn, &sql)))
            }
            Route::Ignored => Ok(Dispatch::Ignored),
        }
    }
}

impl<B: Broker> GatewayModule for SqliteModule<B> {
    type Configuration = Configuration;
    type Broker = B;

    fn parse_configuration(text: &str) -> Result<Configuration> {
        Ok(parse_configuration(text)?)
    }

    fn create(broker: B, configuration: Configuration) -> Result<Self> {
        Ok(Self::with_cache(broker, configuration, SingleConnection::new()))
    }

    fn start(&mut self) {
        let report = self.start_with_report();
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "provisioning finished with failures");
        }
    }

    fn receive(&mut self, message: &Message) {
        match self.handle(message) {
            Ok(Dispatch::Ignored) => debug!("message not addressed to this module"),
            Ok(_) => {}
            Err(err @ ModuleError::Broker(_)) => error!(error = %err, "unable to publish result"),
            Err(err) => warn!(error = %err, "dropping command"),
        }
    }

    fn destroy(mut self) {
        self.cache.close();
        info!("sqlite module destroyed");
    }
}
