//! Retention pruning of old releases

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;
use crate::lock::DeployLock;
use crate::release::Release;
use crate::store::ReleaseStore;

/// Prunes the oldest releases beyond a configured target count.
pub struct RetentionPolicy<'a> {
    executor: &'a dyn RemoteExecutor,
    config: &'a Config,
}

impl<'a> RetentionPolicy<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, config: &'a Config) -> Self {
        Self { executor, config }
    }

    /// Remove the oldest releases beyond `target_count` and return them.
    ///
    /// Passing 0 selects the configured `keep_releases`. Nothing is removed
    /// unless more than one release exceeds the target: the floor keeps at
    /// least one deployable release at all times, and a set of exactly
    /// `target_count + 1` releases is left alone.
    pub fn cleanup(&self, target_count: usize) -> Result<Vec<Release>> {
        let lock = DeployLock::acquire(self.executor, self.config)?;

        let target = if target_count == 0 {
            self.config.retention.keep_releases
        } else {
            target_count
        };

        let store = ReleaseStore::new(self.executor, self.config);
        let releases = store.list_releases()?;

        let excess = releases.len().saturating_sub(target);
        if excess <= 1 {
            tracing::debug!(count = releases.len(), target_count = target, "Nothing to prune");
            lock.release()?;
            return Ok(Vec::new());
        }

        let pruned = &releases[..excess];
        for release in pruned {
            tracing::info!(release = %release.id, "Pruning release {}", release.path);
            self.executor
                .remove_tree(&release.path)
                .map_err(|source| Error::RemovalFailed {
                    path: release.path.clone(),
                    source,
                })?;
        }

        let pruned = pruned.to_vec();
        lock.release()?;
        Ok(pruned)
    }
}
