//! oxide-changeset CLI
//!
//! Command-line tool for applying versioned SQL changesets.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_changeset::prelude::*;

/// Versioned SQL changesets with a checksummed ledger.
#[derive(Parser)]
#[command(name = "oxide-changeset")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (sqlite:, postgres:// or mysql://).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Root directory the base path is resolved against.
    #[arg(long, env = "CHANGESET_DIR", default_value = ".")]
    dir: PathBuf,

    /// Directory holding the changeset files, relative to `--dir`.
    #[arg(short, long, default_value = "migrations")]
    base_path: String,

    /// Ledger table name.
    #[arg(short, long, env = "CHANGESET_TABLE")]
    table: Option<String>,

    /// Apply changesets older than the current ledger version.
    #[arg(long)]
    out_of_order: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending changesets.
    Migrate,

    /// Show applied and pending changesets.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Status<'a> {
    ledger: &'a Ledger,
    pending: Vec<&'a Migration>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config =
        Config::new(DirSource::new(cli.dir), cli.base_path).out_of_order(cli.out_of_order);
    if let Some(table) = cli.table {
        config = config.table_name(table);
    }

    let ds = SqlDataSource::connect(&cli.database, &config).await?;
    let migrator = Migrator::new(config.out_of_order);

    match cli.command {
        Commands::Migrate => {
            let report = migrator.migrate(&ds).await?;
            if report.applied.is_empty() {
                info!("No changesets to apply.");
            }
            for migration in &report.applied {
                println!(" [+] {}", migration.file);
            }
        }

        Commands::Status { json } => {
            let ledger = ds.ledger().await?;
            let plan = migrator.plan(&ds).await?;
            let pending: Vec<&Migration> = plan
                .iter()
                .filter(|p| p.verdict == Verdict::Pending)
                .map(|p| &p.migration)
                .collect();

            if json {
                let status = Status {
                    ledger: &ledger,
                    pending,
                };
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!("\nLedger {} at version {}:", ledger.table_name, ledger.version);
            println!("{:-<60}", "");
            for migration in &ledger.migrations {
                let applied_at = migration
                    .created_at
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(" [X] {} ({})", migration.file, applied_at);
            }
            for migration in &pending {
                println!(" [ ] {}", migration.file);
            }
            println!();
        }
    }

    Ok(())
}
