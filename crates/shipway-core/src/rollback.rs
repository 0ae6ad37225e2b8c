//! Rollback to the previous release

use crate::config::Config;
use crate::deploy::Deployer;
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;
use crate::lock::DeployLock;
use crate::release::Release;
use crate::store::ReleaseStore;

/// Removes the newest release and repoints `current` at the prior one.
pub struct RollbackManager<'a> {
    executor: &'a dyn RemoteExecutor,
    config: &'a Config,
}

impl<'a> RollbackManager<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, config: &'a Config) -> Self {
        Self { executor, config }
    }

    /// Remove the newest release and cut over to the one before it.
    ///
    /// Nothing requires a prior release to exist: rolling back the only
    /// release removes it and the subsequent cutover fails with
    /// `EmptyReleaseSet`, leaving `current` stale. A cutover failure after
    /// the removal likewise leaves one fewer release and a stale `current`.
    /// Both states are surfaced to the operator, not repaired.
    pub fn rollback(&self) -> Result<Release> {
        let lock = DeployLock::acquire(self.executor, self.config)?;

        let store = ReleaseStore::new(self.executor, self.config);
        let latest = store.latest_release()?;

        tracing::info!(release = %latest.id, "Removing release {}", latest.path);
        self.executor
            .remove_tree(&latest.path)
            .map_err(|source| Error::RemovalFailed {
                path: latest.path.clone(),
                source,
            })?;

        let deployer = Deployer::new(self.executor, self.config);
        let current = deployer.cutover()?;

        lock.release()?;
        Ok(current)
    }
}
