//! Error types for SQLite operations.
//!
//! SQL errors raised by commands are not represented here: the executor
//! captures them into [`ResultDocument::Error`](crate::ResultDocument).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while managing the database connection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened.
    #[error("cannot open database '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
