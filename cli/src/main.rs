use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sqlite_gateway_core::{Configuration, parse_configuration};
use sqlite_gateway_module::{Broker, BrokerError, GatewayModule, Message, SqliteModule};
use sqlite_gateway_sqlite::{ConnectionCache, Provisioner, SingleConnection, execute, schema};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sqlite-gateway")]
#[command(about = "Host harness for the SQLite gateway module", version)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse and validate a configuration, printing the provisioning SQL.
    Check(ConfigArgs),
    /// Create every configured table and retention trigger.
    Provision(ConfigArgs),
    /// Execute SQL against a database file and print the result document.
    Exec(ExecArgs),
    /// Run the module over JSON-line messages on stdin/stdout.
    Run(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Gateway configuration JSON file.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct ExecArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// SQL text, executed verbatim.
    #[arg(long)]
    sql: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Provision(args) => run_provision(args),
        Command::Exec(args) => run_exec(args),
        Command::Run(args) => run_module(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_configuration(path: &Path) -> Result<Configuration, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    parse_configuration(&text).map_err(|err| format!("Invalid configuration '{}': {err}", path.display()))
}

fn run_check(args: ConfigArgs) -> Result<(), String> {
    let config = load_configuration(&args.config)?;
    println!("macAddress: {}", config.mac_address);
    println!("{} source(s)", config.sources.len());
    for source in &config.sources {
        println!();
        println!(
            "[{}] table '{}' in '{}', row limit {}",
            source.id,
            source.table,
            source.db_path,
            if source.has_retention() {
                source.row_limit.to_string()
            } else {
                "none".to_string()
            }
        );
        for statement in schema::provisioning_statements(source) {
            println!("{statement}");
        }
    }
    Ok(())
}

fn run_provision(args: ConfigArgs) -> Result<(), String> {
    let config = load_configuration(&args.config)?;
    let mut cache = SingleConnection::new();
    let report = Provisioner::new(&mut cache).provision_all(&config.sources);
    cache.close();

    println!(
        "Provisioned {} source(s): {} table(s) ensured, {} trigger(s) dropped, {} trigger(s) installed.",
        config.sources.len(),
        report.tables_ensured,
        report.triggers_dropped,
        report.triggers_installed
    );
    if report.is_clean() {
        return Ok(());
    }

    eprintln!("\nFailures:");
    for failure in &report.failures {
        match &failure.statement {
            Some(statement) => eprintln!("  {}: {} ({statement})", failure.source_id, failure.message),
            None => eprintln!("  {}: {}", failure.source_id, failure.message),
        }
    }
    Err(format!("{} provisioning step(s) failed", report.failures.len()))
}

fn run_exec(args: ExecArgs) -> Result<(), String> {
    let mut cache = SingleConnection::new();
    let conn = cache.ensure_open(&args.db).map_err(|err| err.to_string())?;
    let document = execute(conn, &args.sql);
    println!("{}", document.to_json_pretty());
    match document.error() {
        Some(message) => Err(format!("SQL execution failed: {message}")),
        None => Ok(()),
    }
}

/// Inbound JSON line: `content` may be a string or any JSON value.
#[derive(Debug, Deserialize)]
struct InboundLine {
    #[serde(default)]
    properties: BTreeMap<String, String>,
    content: serde_json::Value,
}

impl InboundLine {
    fn into_message(self) -> Message {
        let content = match self.content {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        };
        self.properties
            .into_iter()
            .fold(Message::new(content), |msg, (key, value)| msg.with_property(key, value))
    }
}

#[derive(Debug, Serialize)]
struct OutboundLine<'a> {
    properties: &'a BTreeMap<String, String>,
    content: String,
}

/// Writes every published message to stdout as one JSON line.
struct StdoutBroker;

impl Broker for StdoutBroker {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        let line = OutboundLine {
            properties: message.properties(),
            content: message.content_text(),
        };
        let json = serde_json::to_string(&line).map_err(|err| BrokerError(err.to_string()))?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{json}")
            .and_then(|()| stdout.flush())
            .map_err(|err| BrokerError(err.to_string()))
    }
}

fn run_module(args: ConfigArgs) -> Result<(), String> {
    let text = fs::read_to_string(&args.config)
        .map_err(|err| format!("Failed to read '{}': {err}", args.config.display()))?;
    let config = SqliteModule::<StdoutBroker>::parse_configuration(&text)
        .map_err(|err| format!("Invalid configuration '{}': {err}", args.config.display()))?;
    let mut module = SqliteModule::create(StdoutBroker, config).map_err(|err| err.to_string())?;
    module.start();

    let stdin = io::stdin();
    for (idx, line) in stdin.lock().lines().enumerate() {
        let line = line.map_err(|err| format!("Failed to read stdin: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundLine>(&line) {
            Ok(inbound) => {
                debug!(line = idx + 1, "message received");
                module.receive(&inbound.into_message());
            }
            Err(err) => warn!(line = idx + 1, error = %err, "skipping malformed input line"),
        }
    }

    module.destroy();
    Ok(())
}
