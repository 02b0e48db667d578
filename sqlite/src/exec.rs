//! Verbatim SQL execution and result encoding.
//!
//! [`execute`] runs SQL text the way SQLite's `exec` does: statement by
//! statement, collecting every row any statement returns and stopping at
//! the first error. Already-applied statements are not rolled back.
//!
//! The outcome is a [`ResultDocument`], serialized for the bus as
//!
//! ```json
//! {
//!   "result[0]": { "ID": "1", "NAME": "Paul" },
//!   "result[1]": { "ID": "2", "NAME": "NULL" }
//! }
//! ```
//!
//! or `{"error": "<message>"}`. Every cell is text; SQL `NULL` is the
//! literal string `"NULL"`.

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

/// Placeholder text for SQL `NULL` cells.
pub const NULL_TEXT: &str = "NULL";

/// One result row: column name/value pairs in the order SQLite reports
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    cells: Vec<(String, String)>,
}

impl ResultRow {
    /// Sets a cell; a repeated column name overwrites the earlier value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column names in reported order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Outcome of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultDocument {
    /// Every row returned, in engine order. Empty for statements that
    /// return nothing.
    Rows(Vec<ResultRow>),
    /// SQLite's error message.
    Error(String),
}

impl ResultDocument {
    /// Returns the rows, or `None` for an error document.
    pub fn rows(&self) -> Option<&[ResultRow]> {
        match self {
            ResultDocument::Rows(rows) => Some(rows),
            ResultDocument::Error(_) => None,
        }
    }

    /// Returns the error message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            ResultDocument::Rows(_) => None,
            ResultDocument::Error(message) => Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultDocument::Error(_))
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> String {
        // Serializing string maps into a String cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl Serialize for ResultDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultDocument::Rows(rows) => {
                let mut map = serializer.serialize_map(Some(rows.len()))?;
                for (idx, row) in rows.iter().enumerate() {
                    map.serialize_entry(&format!("result[{idx}]"), row)?;
                }
                map.end()
            }
            ResultDocument::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

/// Executes SQL text against a connection.
///
/// Never fails: SQL errors are captured in [`ResultDocument::Error`].
///
/// # Examples
///
/// ```
/// use rusqlite::Connection;
/// use sqlite_gateway_sqlite::execute;
///
/// let conn = Connection::open_in_memory().unwrap();
/// let doc = execute(&conn, "CREATE TABLE t (a INT, b TEXT); \
///                           INSERT INTO t VALUES (1, NULL); \
///                           SELECT * FROM t;");
/// let rows = doc.rows().unwrap();
/// assert_eq!(rows[0].get("a"), Some("1"));
/// assert_eq!(rows[0].get("b"), Some("NULL"));
///
/// let doc = execute(&conn, "SELECT * FROM missing;");
/// assert_eq!(doc.error(), Some("no such table: missing"));
/// ```
pub fn execute(conn: &Connection, sql: &str) -> ResultDocument {
    match collect_rows(conn, sql) {
        Ok(rows) => {
            debug!(rows = rows.len(), "operation done successfully");
            ResultDocument::Rows(rows)
        }
        Err(err) => {
            let message = error_message(&err);
            warn!(error = %message, "SQL error");
            ResultDocument::Error(message)
        }
    }
}

fn collect_rows(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<ResultRow>> {
    let mut result = Vec::new();
    let mut batch = Batch::new(conn, sql);

    while let Some(mut stmt) = batch.next()? {
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        // Placeholders stay unbound and read as NULL.
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut out = ResultRow::default();
            for (idx, name) in names.iter().enumerate() {
                let value = cell_text(conn, row.get_ref(idx)?)?;
                debug!("{name} = {value}");
                out.insert(name.as_str(), value);
            }
            result.push(out);
        }
    }

    Ok(result)
}

/// Renders a cell as text the way SQLite's `exec` callback sees it.
fn cell_text(conn: &Connection, value: ValueRef<'_>) -> rusqlite::Result<String> {
    Ok(match value {
        ValueRef::Null => NULL_TEXT.to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => real_text(conn, f)?,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}

/// Engine text for a REAL (15 significant digits, always with a `.`).
fn real_text(conn: &Connection, value: f64) -> rusqlite::Result<String> {
    conn.prepare_cached("SELECT CAST(?1 AS TEXT)")?
        .query_row([value], |row| row.get(0))
}

/// Extracts SQLite's own message, without rusqlite's decoration.
fn error_message(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE COMPANY (ID INT PRIMARY KEY NOT NULL, NAME TEXT NOT NULL, AGE INT, SALARY REAL);
             INSERT INTO COMPANY VALUES (1, 'Paul', 32, 20000.0);
             INSERT INTO COMPANY VALUES (2, 'Allen', NULL, 15000.5);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_select_rows_in_order() {
        let conn = company();
        let doc = execute(&conn, "SELECT * FROM COMPANY ORDER BY ID;");
        let rows = doc.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].columns().collect::<Vec<_>>(),
            vec!["ID", "NAME", "AGE", "SALARY"]
        );
        assert_eq!(rows[0].get("NAME"), Some("Paul"));
        assert_eq!(rows[0].get("SALARY"), Some("20000.0"));
        assert_eq!(rows[1].get("AGE"), Some("NULL"));
        assert_eq!(rows[1].get("SALARY"), Some("15000.5"));
    }

    #[test]
    fn test_statement_without_rows() {
        let conn = company();
        let doc = execute(&conn, "INSERT INTO COMPANY VALUES (3, 'Teddy', 23, 1.0);");
        assert_eq!(doc, ResultDocument::Rows(Vec::new()));
        assert_eq!(doc.to_json_pretty(), "{}");
    }

    #[test]
    fn test_multiple_statements_collect_all_rows() {
        let conn = company();
        let doc = execute(&conn, "SELECT ID FROM COMPANY WHERE ID = 1; SELECT NAME FROM COMPANY WHERE ID = 2;");
        let rows = doc.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("ID"), Some("1"));
        assert_eq!(rows[1].get("NAME"), Some("Allen"));
    }

    #[test]
    fn test_error_stops_execution_without_rollback() {
        let conn = company();
        let doc = execute(
            &conn,
            "INSERT INTO COMPANY VALUES (3, 'Teddy', 23, 1.0); INSERT INTO NOPE VALUES (1); INSERT INTO COMPANY VALUES (4, 'Mark', 25, 1.0);",
        );
        assert_eq!(doc.error(), Some("no such table: NOPE"));

        let count: i64 = conn
            .query_row("SELECT count(*) FROM COMPANY", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_constraint_error_message() {
        let conn = company();
        let doc = execute(&conn, "INSERT INTO COMPANY VALUES (1, 'Dup', 1, 1.0);");
        assert!(doc.is_error());
        assert!(doc.error().unwrap().contains("UNIQUE constraint failed"));
    }

    #[test]
    fn test_serialize_rows() {
        let conn = company();
        let doc = execute(&conn, "SELECT ID, NAME FROM COMPANY ORDER BY ID;");
        let value: serde_json::Value = serde_json::from_str(&doc.to_json_pretty()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "result[0]": {"ID": "1", "NAME": "Paul"},
                "result[1]": {"ID": "2", "NAME": "Allen"}
            })
        );
    }

    #[test]
    fn test_serialize_keeps_column_order() {
        let conn = company();
        let doc = execute(&conn, "SELECT NAME, ID FROM COMPANY WHERE ID = 1;");
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"result[0]":{"NAME":"Paul","ID":"1"}}"#);
    }

    #[test]
    fn test_serialize_error() {
        let doc = ResultDocument::Error("near \"SELEC\": syntax error".into());
        let value: serde_json::Value = serde_json::from_str(&doc.to_json_pretty()).unwrap();
        assert_eq!(value, serde_json::json!({"error": "near \"SELEC\": syntax error"}));
    }

    #[test]
    fn test_duplicate_column_names_overwrite() {
        let conn = Connection::open_in_memory().unwrap();
        let doc = execute(&conn, "SELECT 1 AS x, 2 AS x;");
        let rows = doc.rows().unwrap();
        assert_eq!(rows[0].columns().count(), 1);
        assert_eq!(rows[0].get("x"), Some("2"));
    }

    #[test]
    fn test_empty_sql_yields_no_rows() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(execute(&conn, "  "), ResultDocument::Rows(Vec::new()));
    }

    #[test]
    fn test_real_cells_match_engine_text() {
        let conn = Connection::open_in_memory().unwrap();
        let doc = execute(
            &conn,
            "SELECT 1e20 AS big, 1.0/3 AS third, 1e-7 AS tiny, 123456789012345678.0 AS long, \
                    1.0 AS one, -2.5 AS neg, \
                    CAST(1.0/3 AS TEXT) AS third_text, CAST(1e20 AS TEXT) AS big_text;",
        );
        let row = &doc.rows().unwrap()[0];
        assert_eq!(row.get("big"), Some("1.0e+20"));
        assert_eq!(row.get("third"), Some("0.333333333333333"));
        assert_eq!(row.get("tiny"), Some("1.0e-07"));
        assert_eq!(row.get("long"), Some("1.23456789012346e+17"));
        assert_eq!(row.get("one"), Some("1.0"));
        assert_eq!(row.get("neg"), Some("-2.5"));
        assert_eq!(row.get("third"), row.get("third_text"));
        assert_eq!(row.get("big"), row.get("big_text"));
    }

    #[test]
    fn test_unbound_placeholders_read_as_null() {
        let conn = Connection::open_in_memory().unwrap();
        let doc = execute(&conn, "SELECT ? AS p, ?2 AS q, 5 AS r;");
        let rows = doc.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("p"), Some("NULL"));
        assert_eq!(rows[0].get("q"), Some("NULL"));
        assert_eq!(rows[0].get("r"), Some("5"));
    }
}
