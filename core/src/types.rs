//! Configuration data model.
//!
//! A [`Configuration`] owns an ordered list of [`Source`]s; each source owns
//! its ordered [`Column`]s. Order is configuration order and drives the
//! column order of generated `CREATE TABLE` statements.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Tag the module attaches to its own messages and the property name peer
/// modules use to address it.
pub const MODULE_TAG: &str = "sqlite";

/// One column of a source table.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_core::Column;
///
/// let col = Column::new("ts", "CHAR(19)").primary_key().not_null();
/// assert!(col.primary_key);
/// assert_eq!(col.sql_type, "CHAR(19)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its source.
    pub name: String,
    /// SQL type text, passed to SQLite verbatim.
    pub sql_type: String,
    /// Whether the column is part of the composite primary key.
    pub primary_key: bool,
    /// Whether the column is declared `NOT NULL`.
    pub not_null: bool,
}

impl Column {
    /// Creates a nullable, non-key column.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            not_null: false,
        }
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// One logical data feed bound to one SQLite table.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_core::{Column, Source};
///
/// let source = Source::new("temp", "/data/edge.db", "Temperature")
///     .with_row_limit(100)
///     .with_column(Column::new("ts", "CHAR(19)").primary_key())
///     .with_column(Column::new("value", "REAL"));
///
/// assert!(source.has_retention());
/// assert_eq!(source.primary_key_columns().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Routing key, unique across the configuration.
    pub id: String,
    /// Path of the backing database file.
    pub db_path: String,
    /// Table name.
    pub table: String,
    /// Maximum number of rows kept; `0` disables retention.
    pub row_limit: u64,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl Source {
    pub fn new(id: impl Into<String>, db_path: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            db_path: db_path.into(),
            table: table.into(),
            row_limit: 0,
            columns: Vec::new(),
        }
    }

    pub fn with_row_limit(mut self, row_limit: u64) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Returns the database path as a [`Path`].
    pub fn path(&self) -> &Path {
        Path::new(&self.db_path)
    }

    /// Returns `true` if a retention trigger should be installed.
    pub fn has_retention(&self) -> bool {
        self.row_limit > 0
    }

    /// Iterates the primary-key columns in declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

/// Root of the parsed configuration.
///
/// Built once at startup and consumed when the module is created: the
/// module takes ownership of [`sources`](Self::sources).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Opaque tag copied onto every outbound message.
    pub mac_address: String,
    /// Sources in configuration order.
    pub sources: Vec<Source>,
}

impl Configuration {
    /// Finds a source by id.
    pub fn find_source(&self, id: &str) -> Option<&Source> {
        find_source(&self.sources, id)
    }
}

/// Finds a source by id in a source list.
pub fn find_source<'a>(sources: &'a [Source], id: &str) -> Option<&'a Source> {
    sources.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_columns_keep_order() {
        let source = Source::new("s", "s.db", "T")
            .with_column(Column::new("b", "INT").primary_key())
            .with_column(Column::new("x", "TEXT"))
            .with_column(Column::new("a", "INT").primary_key());
        let names: Vec<_> = source.primary_key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_find_source() {
        let config = Configuration {
            mac_address: "00:11:22:33:44:55".into(),
            sources: vec![Source::new("a", "a.db", "A"), Source::new("b", "b.db", "B")],
        };
        assert_eq!(config.find_source("b").unwrap().table, "B");
        assert!(config.find_source("c").is_none());
    }

    #[test]
    fn test_zero_limit_has_no_retention() {
        assert!(!Source::new("a", "a.db", "A").has_retention());
        assert!(Source::new("a", "a.db", "A").with_row_limit(1).has_retention());
    }
}
