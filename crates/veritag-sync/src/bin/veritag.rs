//! # Veritag CLI
//!
//! Drives the resolution engine from a terminal.
//!
//! ## Usage
//! ```bash
//! # Resolve a scanned link
//! veritag scan "https://verify.veritag.io/t/qr_ABCDEFGHIJKLMNOPQRST"
//!
//! # Retry scans queued while offline
//! veritag drain
//!
//! # Show the cache and the offline queue
//! veritag status
//!
//! # Print the effective configuration
//! veritag config
//!
//! # Persist it (keeps the generated device identity across runs)
//! veritag config --save
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG`; results are printed to
//! stdout as JSON.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use veritag_core::{CachedProduct, PendingResolutionEntry, SystemClock};
use veritag_db::{Database, DbConfig};
use veritag_sync::{HttpResolver, ResolutionOrchestrator, ResolveResult, VeritagConfig};

/// Veritag - verify scanned products, offline or online
#[derive(Parser)]
#[command(name = "veritag", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "VERITAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a scanned payload
    Scan {
        /// The raw scanned text
        payload: String,
    },

    /// Retry every queued scan (run when connectivity returns)
    Drain,

    /// Show cached products and the offline queue
    Status,

    /// Print the effective configuration as TOML
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Serialize)]
struct StatusReport {
    pending_count: usize,
    pending: Vec<PendingResolutionEntry>,
    cached: Vec<CachedProduct>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,veritag=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> ResolveResult<()> {
    let config = VeritagConfig::load(cli.config.clone())?;

    if let Command::Config { save } = cli.command {
        if save {
            config.save(cli.config)?;
        }
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let resolver = Arc::new(HttpResolver::from_config(&config)?);

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(DbConfig::new(db_path)).await?;

    let orchestrator = ResolutionOrchestrator::with_routines(
        db.clone(),
        resolver,
        Arc::new(SystemClock),
        config.remote.allowed_host.clone(),
    );

    let result = execute(&orchestrator, cli.command).await;

    db.close().await;
    result
}

async fn execute(orchestrator: &ResolutionOrchestrator, command: Command) -> ResolveResult<()> {
    match command {
        Command::Scan { payload } => print_json(&orchestrator.resolve_now(&payload).await?),
        Command::Drain => print_json(&orchestrator.on_reconnect().await?),
        Command::Status => print_json(&StatusReport {
            pending_count: orchestrator.pending_count().await?,
            pending: orchestrator.pending_entries().await?,
            cached: orchestrator.cached_products().await?,
        }),
        Command::Config { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> ResolveResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritag_sync::ResolveError;

    #[tokio::test]
    async fn test_failed_command_still_releases_database() {
        let dir = std::env::temp_dir().join(format!("veritag-cli-{}", uuid::Uuid::new_v4()));
        let db_path = dir.join("data").join("veritag.db");
        let config_path = dir.join("veritag.toml");

        let mut config = VeritagConfig::default();
        config.storage.database_path = Some(db_path.clone());
        config.save(Some(config_path.clone())).unwrap();

        let cli = Cli::try_parse_from([
            "veritag",
            "--config",
            config_path.to_str().unwrap(),
            "scan",
            "https://shop.example.com/t/qr_ABCDEFGHIJKLMNOPQRST",
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert!(matches!(err, ResolveError::Validation(_)));

        // The pool was closed, so the database opens cleanly again
        let db = Database::new(DbConfig::new(db_path)).await.unwrap();
        assert!(db.health_check().await);
        db.close().await;

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_save_flag_parses() {
        let cli = Cli::try_parse_from(["veritag", "config", "--save"]).unwrap();
        assert!(matches!(cli.command, Command::Config { save: true }));
    }
}
