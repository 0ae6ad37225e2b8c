//! Setup command implementation

use miette::{IntoDiagnostic, Result};

use shipway_core::config::Config;
use shipway_core::deploy::Deployer;
use shipway_core::executor::RemoteExecutor;

/// Run the setup command
pub fn run(executor: &dyn RemoteExecutor, config: &Config) -> Result<()> {
    let deployer = Deployer::new(executor, config);
    deployer.ensure_layout().into_diagnostic()?;

    tracing::info!("Deployment layout ready at {}", config.target.root);
    Ok(())
}
