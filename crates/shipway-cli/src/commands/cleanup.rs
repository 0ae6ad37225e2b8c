//! Cleanup command implementation

use clap::Args;
use miette::{IntoDiagnostic, Result};

use shipway_core::config::Config;
use shipway_core::executor::RemoteExecutor;
use shipway_core::retention::RetentionPolicy;

/// Arguments for the cleanup command
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Number of releases to keep; 0 selects the configured keep_releases
    #[arg(short, long, default_value_t = 0)]
    pub keep: usize,
}

/// Run the cleanup command
pub fn run(executor: &dyn RemoteExecutor, config: &Config, args: CleanupArgs) -> Result<()> {
    let policy = RetentionPolicy::new(executor, config);
    let pruned = policy.cleanup(args.keep).into_diagnostic()?;

    if pruned.is_empty() {
        tracing::info!("Nothing to prune");
    } else {
        tracing::info!("Pruned {} release(s)", pruned.len());
    }
    Ok(())
}
