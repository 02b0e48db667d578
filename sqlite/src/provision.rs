//! Startup provisioning of source tables and retention triggers.
//!
//! [`Provisioner`] runs the script from [`provisioning_statements`] for each
//! source through the connection cache. Statements go through the regular
//! executor, and failures are logged and recorded but never abort
//! provisioning: the remaining statements and sources are still applied.
//!
//! # Example
//!
//! ```no_run
//! use sqlite_gateway_core::parse_configuration;
//! use sqlite_gateway_sqlite::{Provisioner, SingleConnection};
//!
//! let config = parse_configuration(&std::fs::read_to_string("gateway.json").unwrap()).unwrap();
//! let mut cache = SingleConnection::new();
//! let report = Provisioner::new(&mut cache).provision_all(&config.sources);
//! println!("{} tables ensured, {} failures", report.tables_ensured, report.failures.len());
//! ```

use sqlite_gateway_core::Source;
use tracing::{info, warn};

use crate::connection::ConnectionCache;
use crate::exec::{ResultDocument, execute};
use crate::schema::{create_table_sql, create_trigger_sql, drop_trigger_sql, provisioning_statements};

/// Applies source definitions to their databases.
pub struct Provisioner<'a, C: ConnectionCache> {
    cache: &'a mut C,
}

impl<'a, C: ConnectionCache> Provisioner<'a, C> {
    pub fn new(cache: &'a mut C) -> Self {
        Self { cache }
    }

    /// Provisions every source in order.
    pub fn provision_all(&mut self, sources: &[Source]) -> ProvisionReport {
        let mut report = ProvisionReport::default();
        for source in sources {
            report.merge(self.provision(source));
        }
        report
    }

    /// Provisions one source: ensures the table exists and the retention
    /// trigger matches the configured limit.
    pub fn provision(&mut self, source: &Source) -> ProvisionReport {
        let mut report = ProvisionReport::default();

        let conn = match self.cache.ensure_open(source.path()) {
            Ok(conn) => conn,
            Err(err) => {
                warn!(source = %source.id, error = %err, "skipping provisioning");
                report.failures.push(ProvisionFailure {
                    source_id: source.id.clone(),
                    statement: None,
                    message: err.to_string(),
                });
                return report;
            }
        };

        let create_table = create_table_sql(source);
        let drop_trigger = drop_trigger_sql(source);
        let create_trigger = create_trigger_sql(source);

        for sql in provisioning_statements(source) {
            if let ResultDocument::Error(message) = execute(conn, &sql) {
                warn!(source = %source.id, %sql, error = %message, "provisioning statement failed");
                report.failures.push(ProvisionFailure {
                    source_id: source.id.clone(),
                    statement: Some(sql),
                    message,
                });
                continue;
            }

            if sql == create_table {
                report.tables_ensured += 1;
            } else if sql == drop_trigger {
                report.triggers_dropped += 1;
            } else if create_trigger.as_deref() == Some(sql.as_str()) {
                report.triggers_installed += 1;
            }
        }

        info!(
            source = %source.id,
            table = %source.table,
            row_limit = source.row_limit,
            "provisioned source"
        );
        report
    }
}

/// Report of a provisioning run.
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    /// Number of `CREATE TABLE IF NOT EXISTS` statements applied.
    pub tables_ensured: usize,
    /// Number of trigger drop statements applied.
    pub triggers_dropped: usize,
    /// Number of retention triggers created.
    pub triggers_installed: usize,
    /// Statements or sources that failed.
    pub failures: Vec<ProvisionFailure>,
}

impl ProvisionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: ProvisionReport) {
        self.tables_ensured += other.tables_ensured;
        self.triggers_dropped += other.triggers_dropped;
        self.triggers_installed += other.triggers_installed;
        self.failures.extend(other.failures);
    }
}

/// A provisioning step that did not apply.
#[derive(Debug, Clone)]
pub struct ProvisionFailure {
    pub source_id: String,
    /// The failed statement; `None` when the database could not be opened.
    pub statement: Option<String>,
    pub message: String,
}
