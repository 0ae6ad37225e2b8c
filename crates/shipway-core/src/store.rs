//! Ordered view of the releases root
//!
//! The remote filesystem is the source of truth: the listing is recomputed
//! on every call, never cached, because a stale view would be unsafe to base
//! a cutover or rollback decision on.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;
use crate::release::{Release, ReleaseId};

/// Read-through view of the releases currently present on the target.
pub struct ReleaseStore<'a> {
    executor: &'a dyn RemoteExecutor,
    config: &'a Config,
}

impl<'a> ReleaseStore<'a> {
    /// Create a store over the configured releases root.
    pub fn new(executor: &'a dyn RemoteExecutor, config: &'a Config) -> Self {
        Self { executor, config }
    }

    /// All releases under the releases root, ascending by identifier.
    ///
    /// Entries that do not parse as a release identifier are skipped.
    pub fn list_releases(&self) -> Result<Vec<Release>> {
        let releases_dir = self.config.releases_dir();
        let entries = self
            .executor
            .list_directory(&releases_dir)
            .map_err(|source| Error::ResourceUnavailable {
                path: releases_dir.clone(),
                source,
            })?;

        let mut releases = Vec::with_capacity(entries.len());
        for name in entries {
            match name.parse::<ReleaseId>() {
                Ok(id) => releases.push(Release {
                    id,
                    path: releases_dir.join(&name),
                }),
                Err(_) => {
                    tracing::warn!(entry = %name, "Ignoring entry that is not a release");
                }
            }
        }

        releases.sort_by_key(|release| release.id);
        Ok(releases)
    }

    /// The newest release.
    pub fn latest_release(&self) -> Result<Release> {
        self.list_releases()?.pop().ok_or(Error::EmptyReleaseSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_release, test_config, MemoryExecutor};

    #[test]
    fn test_list_releases_empty() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());

        let store = ReleaseStore::new(&executor, &config);
        assert!(store.list_releases().unwrap().is_empty());
    }

    #[test]
    fn test_list_releases_missing_root() {
        let config = test_config();
        let executor = MemoryExecutor::new();

        let store = ReleaseStore::new(&executor, &config);
        let err = store.list_releases().unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_list_releases_ascending() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());

        // Seeded out of order on purpose
        seed_release(&executor, &config, "20260806_120000_000");
        seed_release(&executor, &config, "20260101_000000_000");
        seed_release(&executor, &config, "20260806_115959_999");

        let store = ReleaseStore::new(&executor, &config);
        let releases = store.list_releases().unwrap();

        let ids: Vec<String> = releases.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "20260101_000000_000",
                "20260806_115959_999",
                "20260806_120000_000"
            ]
        );
    }

    #[test]
    fn test_list_releases_skips_foreign_entries() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());

        seed_release(&executor, &config, "20260806_120000_000");
        executor.seed_dir(config.releases_dir().join("README"));

        let store = ReleaseStore::new(&executor, &config);
        let releases = store.list_releases().unwrap();
        assert_eq!(releases.len(), 1);
    }

    #[test]
    fn test_latest_release() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());

        seed_release(&executor, &config, "20260101_000000_000");
        let newest = seed_release(&executor, &config, "20260806_120000_000");

        let store = ReleaseStore::new(&executor, &config);
        assert_eq!(store.latest_release().unwrap().path, newest);
    }

    #[test]
    fn test_latest_release_empty_set() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());

        let store = ReleaseStore::new(&executor, &config);
        assert!(matches!(
            store.latest_release().unwrap_err(),
            Error::EmptyReleaseSet
        ));
    }
}
