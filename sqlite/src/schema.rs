//! SQL generation for source tables and their retention triggers.
//!
//! Every statement is safe to rerun: tables use `CREATE TABLE IF NOT
//! EXISTS`, and retention triggers are dropped and recreated so the body
//! always reflects the configured row limit.
//!
//! # Retention trigger
//!
//! For a source with `row_limit = N > 0` the trigger
//! `{table}_size_control` runs after each insert and, once the table holds
//! more than `N` rows, deletes everything except the `N` rows with the
//! highest rowid. Rowids grow with insertion order, so the survivors are the
//! `N` most recent inserts.
//!
//! Table, column and type names are interpolated verbatim; they come from
//! the module configuration, not from inbound commands.

use sqlite_gateway_core::Source;

/// Generates the `CREATE TABLE IF NOT EXISTS` statement for a source.
///
/// Columns follow declaration order. The composite `PRIMARY KEY` clause
/// lists every key column in declaration order and is left out when no
/// column is a key.
pub fn create_table_sql(source: &Source) -> String {
    let mut clauses: Vec<String> = source
        .columns
        .iter()
        .map(|column| {
            if column.not_null {
                format!("{} {} NOT NULL", column.name, column.sql_type)
            } else {
                format!("{} {}", column.name, column.sql_type)
            }
        })
        .collect();

    let keys: Vec<&str> = source
        .primary_key_columns()
        .map(|column| column.name.as_str())
        .collect();
    if !keys.is_empty() {
        clauses.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        source.table,
        clauses.join(", ")
    )
}

/// Name of the retention trigger for a source.
pub fn trigger_name(source: &Source) -> String {
    format!("{}_size_control", source.table)
}

/// Generates the statement dropping the retention trigger if it exists.
pub fn drop_trigger_sql(source: &Source) -> String {
    format!("DROP TRIGGER IF EXISTS {};", trigger_name(source))
}

/// Generates the retention trigger, or `None` when retention is disabled.
pub fn create_trigger_sql(source: &Source) -> Option<String> {
    if !source.has_retention() {
        return None;
    }

    Some(format!(
        r#"CREATE TRIGGER {name} AFTER INSERT ON {table}
WHEN (SELECT count(*) FROM {table}) > {limit}
BEGIN
    DELETE FROM {table} WHERE rowid NOT IN (SELECT rowid FROM {table} ORDER BY rowid DESC LIMIT {limit});
END;"#,
        name = trigger_name(source),
        table = source.table,
        limit = source.row_limit,
    ))
}

/// Returns the full, ordered provisioning script for a source.
///
/// The trigger is always dropped, so lowering a limit to `0` removes a
/// trigger installed by an earlier configuration.
pub fn provisioning_statements(source: &Source) -> Vec<String> {
    let mut statements = vec![create_table_sql(source), drop_trigger_sql(source)];
    statements.extend(create_trigger_sql(source));
    statements
}
