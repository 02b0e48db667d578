//! Connection caching.
//!
//! The gateway keeps at most one database connection open. Every command
//! first asks the cache to point at its database file; if a different file
//! is open it is closed before the new one is opened. Commands that
//! alternate between sources stored in different files therefore reopen
//! the database on every switch.
//!
//! Callers only see the [`ConnectionCache`] trait, so a cache holding one
//! connection per file can replace [`SingleConnection`] without touching
//! the router.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// Supplies an open connection for a database path.
pub trait ConnectionCache {
    /// Ensures a connection to `path` is open and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the database cannot be opened. After
    /// a failure no connection is assumed to be open.
    fn ensure_open(&mut self, path: &Path) -> Result<&Connection>;

    /// Path of the currently open database, if any.
    fn current_path(&self) -> Option<&Path>;

    /// Closes the open connection, if any. Close errors are logged.
    fn close(&mut self);
}

struct OpenConnection {
    path: PathBuf,
    conn: Connection,
}

/// A cache holding a single open connection.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_sqlite::{ConnectionCache, SingleConnection};
///
/// let dir = std::env::temp_dir();
/// let mut cache = SingleConnection::new();
/// let conn = cache.ensure_open(&dir.join("doc_a.db")).unwrap();
/// conn.execute_batch("SELECT 1;").unwrap();
/// assert_eq!(cache.current_path(), Some(dir.join("doc_a.db").as_path()));
/// # std::fs::remove_file(dir.join("doc_a.db")).ok();
/// ```
#[derive(Default)]
pub struct SingleConnection {
    slot: Option<OpenConnection>,
}

impl SingleConnection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionCache for SingleConnection {
    fn ensure_open(&mut self, path: &Path) -> Result<&Connection> {
        match self.slot.take() {
            Some(open) if open.path == path => {
                debug!(path = %path.display(), "reusing open database");
                Ok(&self.slot.insert(open).conn)
            }
            previous => {
                if let Some(previous) = previous {
                    close_connection(previous);
                }
                let conn = Connection::open(path).map_err(|source| StoreError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(path = %path.display(), "opened database");
                let open = self.slot.insert(OpenConnection {
                    path: path.to_path_buf(),
                    conn,
                });
                Ok(&open.conn)
            }
        }
    }

    fn current_path(&self) -> Option<&Path> {
        self.slot.as_ref().map(|open| open.path.as_path())
    }

    fn close(&mut self) {
        if let Some(open) = self.slot.take() {
            close_connection(open);
        }
    }
}

impl Drop for SingleConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn close_connection(open: OpenConnection) {
    match open.conn.close() {
        Ok(()) => debug!(path = %open.path.display(), "closed database"),
        Err((_conn, err)) => {
            warn!(path = %open.path.display(), error = %err, "failed to close database");
        }
    }
}
