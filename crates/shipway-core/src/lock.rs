//! Mutual exclusion for lifecycle operations
//!
//! Deploy, rollback and cleanup all mutate the releases root and the current
//! pointer; interleaving them can delete a release another invocation is
//! about to repoint to. The lock is a directory created atomically under the
//! deployment root and held for the duration of one lifecycle operation.

use camino::Utf8PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;

/// Guard for the per-root deploy lock.
///
/// Released explicitly via [`release`](DeployLock::release) on the success
/// path so a removal failure is reported; every other exit path releases it
/// from `Drop`, best effort.
pub struct DeployLock<'a> {
    executor: &'a dyn RemoteExecutor,
    path: Utf8PathBuf,
    released: bool,
}

impl std::fmt::Debug for DeployLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployLock")
            .field("path", &self.path)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl<'a> DeployLock<'a> {
    /// Acquire the lock for the configured deployment root.
    ///
    /// Creation of the lock directory is the atomic gate; a subsequent
    /// existence check only refines the error report.
    pub fn acquire(executor: &'a dyn RemoteExecutor, config: &Config) -> Result<Self> {
        let path = config.lock_dir();

        if let Err(source) = executor.create_directory(&path) {
            return Err(match executor.exists(&path) {
                Ok(true) => Error::LockHeld { path },
                _ => Error::LockFailed { path, source },
            });
        }

        tracing::debug!(path = %path, "Acquired deploy lock");
        Ok(Self {
            executor,
            path,
            released: false,
        })
    }

    /// Release the lock, surfacing a removal failure to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.executor
            .remove_tree(&self.path)
            .map_err(|source| Error::RemovalFailed {
                path: self.path.clone(),
                source,
            })
    }
}

impl Drop for DeployLock<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = self.executor.remove_tree(&self.path) {
            tracing::warn!(path = %self.path, %error, "Failed to release deploy lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, MemoryExecutor};

    #[test]
    fn test_acquire_and_release() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(&config.target.root);

        let lock = DeployLock::acquire(&executor, &config).unwrap();
        assert!(executor.node(&config.lock_dir()).is_some());

        lock.release().unwrap();
        assert!(executor.node(&config.lock_dir()).is_none());

        // Re-acquirable once released
        let lock = DeployLock::acquire(&executor, &config).unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn test_acquire_while_held() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(&config.target.root);

        let _held = DeployLock::acquire(&executor, &config).unwrap();
        let err = DeployLock::acquire(&executor, &config).unwrap_err();
        assert!(matches!(err, Error::LockHeld { .. }));
    }

    #[test]
    fn test_drop_releases() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(&config.target.root);

        {
            let _lock = DeployLock::acquire(&executor, &config).unwrap();
            assert!(executor.node(&config.lock_dir()).is_some());
        }
        assert!(executor.node(&config.lock_dir()).is_none());
    }

    #[test]
    fn test_acquire_without_root() {
        let config = test_config();
        let executor = MemoryExecutor::new();

        let err = DeployLock::acquire(&executor, &config).unwrap_err();
        assert!(matches!(err, Error::LockFailed { .. }));
    }
}
