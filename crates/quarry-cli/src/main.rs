//! quarry CLI
//!
//! Compiles where trees and order specs to SQL fragments, and classifies raw
//! driver errors, for any supported dialect.

mod commands;
mod config;

use std::path::PathBuf;

use clap::Parser;
use quarry_core::DialectKind;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::commands::Commands;
use crate::config::Config;

/// Multi-dialect SQL where/order compiler.
#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with the model graph and defaults.
    #[arg(short, long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,

    /// Target dialect (overrides the config file).
    #[arg(short, long, env = "QUARRY_DIALECT")]
    dialect: Option<DialectKind>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
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
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(cli.config.as_deref())?;
    let dialect = cli
        .dialect
        .or(config.dialect)
        .unwrap_or(DialectKind::Postgres);
    info!(dialect = %dialect, models = config.graph.models.len(), "Loaded configuration");

    println!("{}", cli.command.run(&config, dialect)?);
    Ok(())
}
