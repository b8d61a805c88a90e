//! Discipl CLI: inspect addresses and work with exported linked-data
//! bundles offline.
//!
//! Subcommands: init, inspect, verify, export.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::DisciplConfig;

/// Discipl: platform-agnostic trust layer for self-sovereign identities.
#[derive(Parser, Debug)]
#[command(name = "discipl", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "discipl.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Show the parts of a link or DID.
    Inspect(commands::inspect::InspectArgs),
    /// Verify an attestation against an exported bundle.
    Verify(commands::verify::VerifyArgs),
    /// Re-export a channel or claim from an exported bundle.
    Export(commands::export::ExportArgs),
}

fn init_tracing(config: &DisciplConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(config.logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout carries command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = DisciplConfig::load(&cli.config)?;
    init_tracing(&config, cli.log_level.as_deref());

    match &cli.command {
        Commands::Init(args) => commands::init::run(args, &cli.config),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Verify(args) => commands::verify::run(args, &config).await,
        Commands::Export(args) => commands::export::run(args, &config).await,
    }
}
