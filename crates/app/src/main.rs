use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "netzero")]
#[command(about = "Find transaction groups that do not net to zero and the legs that explain them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile ledger legs from one or more CSV files
    #[command(after_help = "\
Examples:
  netzero reconcile ledger.csv
  netzero reconcile jan.csv feb.csv --config recon.toml --out-dir results/
  netzero reconcile export.csv --delimiter ';' --header-row 1 --decimal-comma --json")]
    Reconcile(commands::ReconcileArgs),

    /// Validate a reconciliation config without running
    CheckConfig {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Reconcile(args) => commands::reconcile(args),
        Command::CheckConfig { config } => commands::check_config(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
