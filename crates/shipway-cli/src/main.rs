//! shipway CLI - release lifecycle management tool

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shipway_core::config::Config;
use shipway_core::executor::{LocalExecutor, RemoteExecutor, SshExecutor};

mod commands;

/// shipway - manage deployed releases on a target host
#[derive(Debug, Parser)]
#[command(name = "shipway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "shipway.toml")]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the deployment layout on the target
    Setup,

    /// Create a release from a source tree and cut over to it
    Deploy(commands::deploy::DeployArgs),

    /// Remove the newest release and repoint current at the prior one
    Rollback,

    /// Prune the oldest releases beyond the retention target
    Cleanup(commands::cleanup::CleanupArgs),

    /// List releases on the target, oldest first
    Releases,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // One immutable configuration per invocation
    let config = Config::load(&cli.config).into_diagnostic()?;

    let executor: Box<dyn RemoteExecutor> = match config.target.host {
        Some(ref host) => {
            tracing::debug!(host = %host, "Using SSH executor");
            Box::new(SshExecutor::new(
                host,
                Duration::from_secs(config.target.connect_timeout_secs),
            ))
        }
        None => Box::new(LocalExecutor),
    };

    match cli.command {
        Commands::Setup => commands::setup::run(executor.as_ref(), &config),
        Commands::Deploy(args) => commands::deploy::run(executor.as_ref(), &config, args),
        Commands::Rollback => commands::rollback::run(executor.as_ref(), &config),
        Commands::Cleanup(args) => commands::cleanup::run(executor.as_ref(), &config, args),
        Commands::Releases => commands::releases::run(executor.as_ref(), &config),
    }
}
