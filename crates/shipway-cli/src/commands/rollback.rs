//! Rollback command implementation

use miette::{IntoDiagnostic, Result};

use shipway_core::config::Config;
use shipway_core::executor::RemoteExecutor;
use shipway_core::rollback::RollbackManager;

/// Run the rollback command
pub fn run(executor: &dyn RemoteExecutor, config: &Config) -> Result<()> {
    let manager = RollbackManager::new(executor, config);
    let current = manager.rollback().into_diagnostic()?;

    tracing::info!(release = %current.id, "Rolled back; current release is {}", current.path);
    Ok(())
}
