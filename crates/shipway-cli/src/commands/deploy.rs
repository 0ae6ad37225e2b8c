//! Deploy command implementation

use camino::Utf8PathBuf;
use clap::Args;
use miette::{IntoDiagnostic, Result};

use shipway_core::config::Config;
use shipway_core::deploy::Deployer;
use shipway_core::executor::RemoteExecutor;

/// Arguments for the deploy command
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Source tree on the target host to snapshot into a release
    pub source: Utf8PathBuf,
}

/// Run the deploy command
pub fn run(executor: &dyn RemoteExecutor, config: &Config, args: DeployArgs) -> Result<()> {
    tracing::info!("Deploying {} to {}", args.source, config.target.root);

    let deployer = Deployer::new(executor, config);
    let release = deployer.deploy(&args.source).into_diagnostic()?;

    tracing::info!(release = %release.id, "Deployment complete");
    Ok(())
}
