//! Release creation and atomic cutover

use camino::Utf8Path;

use crate::config::{Config, CURRENT_LINK};
use crate::error::{CutoverStep, Error, Result};
use crate::executor::RemoteExecutor;
use crate::lock::DeployLock;
use crate::release::{Release, ReleaseId};
use crate::store::ReleaseStore;

/// Version-control metadata stripped from every release copy
const VCS_METADATA: &[&str] = &[".git", ".gitignore", ".gitmodules", ".gitattributes"];

/// Creates releases and repoints the current pointer.
pub struct Deployer<'a> {
    executor: &'a dyn RemoteExecutor,
    config: &'a Config,
}

impl<'a> Deployer<'a> {
    /// Create a deployer for the configured target.
    pub fn new(executor: &'a dyn RemoteExecutor, config: &'a Config) -> Self {
        Self { executor, config }
    }

    /// Create the deployment layout (root and releases directory).
    ///
    /// Idempotent; used by `shipway setup` and before every deploy.
    pub fn ensure_layout(&self) -> Result<()> {
        let releases_dir = self.config.releases_dir();
        self.executor
            .make_directory(&releases_dir)
            .map_err(|source| Error::ResourceUnavailable {
                path: releases_dir,
                source,
            })?;
        Ok(())
    }

    /// Copy `source_tree` into a fresh release directory and strip
    /// version-control metadata from the copy.
    ///
    /// A failed copy leaves the (possibly incomplete) release directory in
    /// place for inspection; the error names the release so an operator can
    /// remove it by hand.
    pub fn create_release(&self, source_tree: &Utf8Path) -> Result<Release> {
        let id = ReleaseId::now();
        let path = self.config.releases_dir().join(id.to_string());

        tracing::info!(release = %id, "Creating release from {}", source_tree);
        self.executor
            .copy_tree(source_tree, &path)
            .map_err(|source| Error::CopyFailed { id, source })?;

        self.strip_vcs_metadata(&path)?;

        Ok(Release { id, path })
    }

    fn strip_vcs_metadata(&self, release_path: &Utf8Path) -> Result<()> {
        for name in VCS_METADATA {
            let path = release_path.join(name);
            self.executor
                .remove_tree(&path)
                .map_err(|source| Error::RemovalFailed { path, source })?;
        }
        Ok(())
    }

    /// Atomically repoint `current` at the latest release.
    ///
    /// A symbolic reference to the target is created under a temporary name
    /// first; a single atomic rename then moves it onto `current`. No
    /// observer ever sees `current` missing or pointing at a path that does
    /// not exist. On failure the new release directory stays on disk and
    /// `current` is unchanged unless the rename itself failed partway.
    pub fn cutover(&self) -> Result<Release> {
        let store = ReleaseStore::new(self.executor, self.config);
        let latest = store.latest_release()?;

        let current = self.config.current_link();
        let staged = self
            .config
            .target
            .root
            .join(format!("{}.{}", CURRENT_LINK, latest.id));

        self.executor
            .create_symlink(&latest.path, &staged)
            .map_err(|source| Error::CutoverFailed {
                step: CutoverStep::Link,
                source,
            })?;

        self.executor
            .atomic_rename(&staged, &current)
            .map_err(|source| Error::CutoverFailed {
                step: CutoverStep::Rename,
                source,
            })?;

        tracing::info!(release = %latest.id, "Current release is now {}", latest.path);
        Ok(latest)
    }

    /// Create a release from `source_tree` and cut over to it.
    ///
    /// Holds the deploy lock for the whole operation.
    pub fn deploy(&self, source_tree: &Utf8Path) -> Result<Release> {
        self.ensure_layout()?;
        let lock = DeployLock::acquire(self.executor, self.config)?;

        let release = self.create_release(source_tree)?;
        self.cutover()?;

        lock.release()?;
        Ok(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resolve_in, seed_release, test_config, MemoryExecutor, Node};

    #[test]
    fn test_create_release_copies_and_strips_vcs() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir("/work/src/.git/objects");
        executor.seed_dir("/work/src/app");

        let deployer = Deployer::new(&executor, &config);
        deployer.ensure_layout().unwrap();
        let release = deployer.create_release(Utf8Path::new("/work/src")).unwrap();

        assert!(executor.node(&release.path).is_some());
        assert!(executor.node(&release.path.join("app")).is_some());
        assert!(executor.node(&release.path.join(".git")).is_none());
    }

    #[test]
    fn test_create_release_copy_failure() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir("/work/src");

        let deployer = Deployer::new(&executor, &config);
        deployer.ensure_layout().unwrap();

        executor.fail_on("copy_tree");
        let err = deployer
            .create_release(Utf8Path::new("/work/src"))
            .unwrap_err();
        assert!(matches!(err, Error::CopyFailed { .. }));
    }

    #[test]
    fn test_cutover_empty_release_set() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());

        let deployer = Deployer::new(&executor, &config);
        assert!(matches!(
            deployer.cutover().unwrap_err(),
            Error::EmptyReleaseSet
        ));
    }

    #[test]
    fn test_cutover_points_current_at_latest() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());
        seed_release(&executor, &config, "20260101_000000_000");
        let newest = seed_release(&executor, &config, "20260806_120000_000");

        let deployer = Deployer::new(&executor, &config);
        let release = deployer.cutover().unwrap();

        assert_eq!(release.path, newest);
        assert_eq!(
            executor.resolve_link(&config.current_link()),
            Some(newest.clone())
        );
        // The staged reference was consumed by the rename
        let staged = config.target.root.join("current.20260806_120000_000");
        assert!(executor.node(&staged).is_none());
    }

    #[test]
    fn test_cutover_is_atomic_for_observers() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());
        seed_release(&executor, &config, "20260101_000000_000");

        let deployer = Deployer::new(&executor, &config);
        deployer.cutover().unwrap();

        // Repoint to a newer release and inspect every intermediate state
        seed_release(&executor, &config, "20260806_120000_000");
        executor.clear_snapshots();
        deployer.cutover().unwrap();

        let current = config.current_link();
        for tree in executor.snapshots() {
            let target = resolve_in(&tree, &current)
                .expect("current must always resolve to an existing release");
            assert!(matches!(tree.get(&target), Some(Node::Dir)));
        }
    }

    #[test]
    fn test_cutover_link_step_failure_leaves_current_untouched() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());
        let old = seed_release(&executor, &config, "20260101_000000_000");

        let deployer = Deployer::new(&executor, &config);
        deployer.cutover().unwrap();

        seed_release(&executor, &config, "20260806_120000_000");
        executor.fail_on("create_symlink");
        let err = deployer.cutover().unwrap_err();

        assert!(matches!(
            err,
            Error::CutoverFailed {
                step: CutoverStep::Link,
                ..
            }
        ));
        assert_eq!(executor.resolve_link(&config.current_link()), Some(old));
    }

    #[test]
    fn test_cutover_rename_step_failure_reported() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir(config.releases_dir());
        let old = seed_release(&executor, &config, "20260101_000000_000");

        let deployer = Deployer::new(&executor, &config);
        deployer.cutover().unwrap();

        seed_release(&executor, &config, "20260806_120000_000");
        executor.fail_on("atomic_rename");
        let err = deployer.cutover().unwrap_err();

        assert!(matches!(
            err,
            Error::CutoverFailed {
                step: CutoverStep::Rename,
                ..
            }
        ));
        // current still points at the old release; the staged reference is
        // left behind for the operator
        assert_eq!(executor.resolve_link(&config.current_link()), Some(old));
        let staged = config.target.root.join("current.20260806_120000_000");
        assert!(executor.node(&staged).is_some());
    }

    #[test]
    fn test_deploy_end_to_end() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir("/work/src/app");

        let deployer = Deployer::new(&executor, &config);
        let release = deployer.deploy(Utf8Path::new("/work/src")).unwrap();

        assert_eq!(
            executor.resolve_link(&config.current_link()),
            Some(release.path.clone())
        );
        // Lock released on success
        assert!(executor.node(&config.lock_dir()).is_none());
    }

    #[test]
    fn test_deploy_releases_lock_on_failure() {
        let config = test_config();
        let executor = MemoryExecutor::new();
        executor.seed_dir("/work/src");

        executor.fail_on("copy_tree");
        let deployer = Deployer::new(&executor, &config);
        assert!(deployer.deploy(Utf8Path::new("/work/src")).is_err());

        assert!(executor.node(&config.lock_dir()).is_none());
    }
}
