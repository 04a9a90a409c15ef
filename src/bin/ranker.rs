//! Binary entry point for the ranker CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ranker::{
    admin::VerifyReport,
    config::RankerConfig,
    rank::{Position, RebalanceReport},
    storage::{Collection, NewRecord, Record, RecordChange, SqliteBackend},
    types::{RecordId, ScopeKey},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ranker",
    version,
    about = "Maintain user-ordered records in a SQLite table",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "RANKER_DB",
        value_name = "FILE",
        help = "SQLite database file (defaults to [database].path)"
    )]
    db: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "RANKER_CONFIG",
        value_name = "FILE",
        help = "Config file (defaults to the user config dir)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Table holding the ranked records")]
    table: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a record.
    Insert {
        label: String,
        #[arg(long)]
        scope: Option<ScopeKey>,
        #[arg(
            long,
            allow_hyphen_values = true,
            help = "last, middle, first or a zero-based offset"
        )]
        position: Option<Position>,
    },
    /// Move a record within its scope, or into another one.
    Move {
        id: u64,
        #[arg(allow_hyphen_values = true)]
        position: Position,
        #[arg(long, help = "Scope to move the record into")]
        scope: Option<ScopeKey>,
    },
    /// Delete a record.
    Delete { id: u64 },
    /// List a scope in rank order.
    List {
        #[arg(long)]
        scope: Option<ScopeKey>,
    },
    /// Respace a scope evenly across the rank range.
    Rebalance {
        #[arg(long)]
        scope: Option<ScopeKey>,
    },
    /// Check every scope for duplicate or out-of-range ranks.
    Verify,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct DeleteReport {
    id: RecordId,
    deleted: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ranker=warn")),
        1 => EnvFilter::new("ranker=debug"),
        _ => EnvFilter::new("ranker=trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = RankerConfig::load(cli.config.clone())?;
    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database.path.clone())
        .ok_or("no database given; pass --db or set [database].path")?;
    let table = cli.table.as_deref().unwrap_or(&config.database.table);
    let backend = SqliteBackend::open(&db_path, table)?;
    let mut collection = Collection::new(backend, config.ranking.clone());

    match cli.command {
        Command::Insert {
            label,
            scope,
            position,
        } => {
            let mut record = NewRecord::new(label).position(position.unwrap_or_default());
            record.scope = scope;
            let record = collection.insert(record)?;
            emit(cli.format, &record, || print_record(&record))?;
        }
        Command::Move {
            id,
            position,
            scope,
        } => {
            let mut change = RecordChange::default().position(position);
            if let Some(scope) = scope {
                change = change.scope(Some(scope));
            }
            let record = collection.update(RecordId(id), change)?;
            emit(cli.format, &record, || print_record(&record))?;
        }
        Command::Delete { id } => {
            let report = DeleteReport {
                id: RecordId(id),
                deleted: collection.delete(RecordId(id))?,
            };
            emit(cli.format, &report, || {
                if report.deleted {
                    println!("deleted {}", report.id);
                } else {
                    println!("no record {}", report.id);
                }
            })?;
        }
        Command::List { scope } => {
            let records = collection.list(scope.as_ref())?;
            emit(cli.format, &records, || print_list(&records))?;
        }
        Command::Rebalance { scope } => {
            let report = collection.rebalance(scope.as_ref())?;
            emit(cli.format, &report, || print_rebalance(&report))?;
        }
        Command::Verify => {
            let report = collection.verify()?;
            emit(cli.format, &report, || print_verify(&report))?;
            if !report.success {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn scope_text(scope: &Option<ScopeKey>) -> String {
    scope
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string)
}

fn print_record(record: &Record) {
    println!(
        "id={} scope={} rank={} label={}",
        record.id,
        scope_text(&record.scope),
        record.rank,
        record.label
    );
}

fn print_list(records: &[Record]) {
    for (ordinal, record) in records.iter().enumerate() {
        println!(
            "{ordinal:>4}  {:>6}  {:>9}  {}",
            record.id.0, record.rank, record.label
        );
    }
}

fn print_rebalance(report: &RebalanceReport) {
    println!(
        "Rebalance => records={} rewritten={}",
        report.records, report.rewritten
    );
}

fn print_verify(report: &VerifyReport) {
    println!(
        "Verify => success={} scopes={} records={} duplicate_ranks={} out_of_bounds={}",
        report.success,
        report.counts.scopes,
        report.counts.records,
        report.counts.duplicate_ranks,
        report.counts.out_of_bounds,
    );
    for finding in &report.findings {
        println!(
            "- {:?} [{}]: {}",
            finding.severity,
            scope_text(&finding.scope),
            finding.message
        );
    }
}
