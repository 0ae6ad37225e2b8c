//! Test support: an in-memory remote executor
//!
//! Models the target host's filesystem as a map from path to node. Mutating
//! operations record a snapshot of the tree, so tests can assert what an
//! external observer could have seen after every individual step - the
//! granularity at which the cutover atomicity guarantee is stated.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Config;
use crate::executor::{ExecError, RemoteExecutor};

/// A node in the simulated target filesystem.
///
/// Regular files are not modeled; the lifecycle core only ever observes
/// directories and symbolic references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    Link(Utf8PathBuf),
}

pub type Tree = BTreeMap<Utf8PathBuf, Node>;

/// In-memory stand-in for a remote host.
#[derive(Default)]
pub struct MemoryExecutor {
    tree: RefCell<Tree>,
    snapshots: RefCell<Vec<Tree>>,
    fail_ops: RefCell<HashSet<&'static str>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a directory and its ancestors.
    pub fn seed_dir(&self, path: impl AsRef<Utf8Path>) {
        insert_with_ancestors(&mut self.tree.borrow_mut(), path.as_ref());
    }

    /// Pre-populate a symbolic reference (ancestors of `link` included).
    pub fn seed_link(&self, target: impl AsRef<Utf8Path>, link: impl AsRef<Utf8Path>) {
        let link = link.as_ref();
        let mut tree = self.tree.borrow_mut();
        if let Some(parent) = link.parent() {
            insert_with_ancestors(&mut tree, parent);
        }
        tree.insert(link.to_path_buf(), Node::Link(target.as_ref().to_path_buf()));
    }

    /// Make every subsequent call of the named operation fail.
    pub fn fail_on(&self, op: &'static str) {
        self.fail_ops.borrow_mut().insert(op);
    }

    /// The node at `path`, if any.
    pub fn node(&self, path: &Utf8Path) -> Option<Node> {
        self.tree.borrow().get(path).cloned()
    }

    /// Target of the link at `path`, if that target exists.
    pub fn resolve_link(&self, path: &Utf8Path) -> Option<Utf8PathBuf> {
        resolve_in(&self.tree.borrow(), path)
    }

    /// Snapshots taken after each mutating operation, oldest first.
    pub fn snapshots(&self) -> Vec<Tree> {
        self.snapshots.borrow().clone()
    }

    pub fn clear_snapshots(&self) {
        self.snapshots.borrow_mut().clear();
    }

    fn check(&self, op: &'static str) -> Result<(), ExecError> {
        if self.fail_ops.borrow().contains(op) {
            return Err(ExecError::CommandFailed {
                op: op.to_string(),
                status: 1,
                stderr: format!("injected failure for {}", op),
            });
        }
        Ok(())
    }

    fn record(&self) {
        let snapshot = self.tree.borrow().clone();
        self.snapshots.borrow_mut().push(snapshot);
    }
}

/// Resolve one level of indirection: a link counts only if its target exists.
pub fn resolve_in(tree: &Tree, path: &Utf8Path) -> Option<Utf8PathBuf> {
    match tree.get(path)? {
        Node::Link(target) => tree.contains_key(target).then(|| target.clone()),
        Node::Dir => None,
    }
}

fn insert_with_ancestors(tree: &mut Tree, path: &Utf8Path) {
    let mut ancestors: Vec<Utf8PathBuf> = path.ancestors().map(|p| p.to_path_buf()).collect();
    ancestors.reverse();
    for ancestor in ancestors {
        if ancestor.as_str().is_empty() || ancestor.as_str() == "/" {
            continue;
        }
        tree.entry(ancestor).or_insert(Node::Dir);
    }
}

fn command_failed(op: &str, stderr: String) -> ExecError {
    ExecError::CommandFailed {
        op: op.to_string(),
        status: 1,
        stderr,
    }
}

impl RemoteExecutor for MemoryExecutor {
    fn list_directory(&self, path: &Utf8Path) -> Result<Vec<String>, ExecError> {
        self.check("list_directory")?;
        let tree = self.tree.borrow();
        if !matches!(tree.get(path), Some(Node::Dir)) {
            return Err(command_failed(
                "ls",
                format!("{}: No such file or directory", path),
            ));
        }
        let mut names: Vec<String> = tree
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    fn make_directory(&self, path: &Utf8Path) -> Result<(), ExecError> {
        self.check("make_directory")?;
        insert_with_ancestors(&mut self.tree.borrow_mut(), path);
        self.record();
        Ok(())
    }

    fn create_directory(&self, path: &Utf8Path) -> Result<(), ExecError> {
        self.check("create_directory")?;
        {
            let mut tree = self.tree.borrow_mut();
            if tree.contains_key(path) {
                return Err(command_failed("mkdir", format!("{}: File exists", path)));
            }
            let parent_exists = path
                .parent()
                .is_some_and(|parent| matches!(tree.get(parent), Some(Node::Dir)));
            if !parent_exists {
                return Err(command_failed(
                    "mkdir",
                    format!("{}: No such file or directory", path),
                ));
            }
            tree.insert(path.to_path_buf(), Node::Dir);
        }
        self.record();
        Ok(())
    }

    fn copy_tree(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError> {
        self.check("copy_tree")?;
        {
            let mut tree = self.tree.borrow_mut();
            if !tree.contains_key(src) {
                return Err(command_failed(
                    "cp",
                    format!("{}: No such file or directory", src),
                ));
            }
            let parent_exists = dst
                .parent()
                .is_some_and(|parent| tree.contains_key(parent));
            if !parent_exists {
                return Err(command_failed(
                    "cp",
                    format!("{}: No such file or directory", dst),
                ));
            }

            let copies: Vec<(Utf8PathBuf, Node)> = tree
                .iter()
                .filter(|(p, _)| p.starts_with(src))
                .map(|(p, node)| {
                    let rel = p
                        .strip_prefix(src)
                        .expect("filtered on prefix - this is a bug in shipway");
                    let dst_path = if rel.as_str().is_empty() {
                        dst.to_path_buf()
                    } else {
                        dst.join(rel)
                    };
                    (dst_path, node.clone())
                })
                .collect();
            tree.extend(copies);
        }
        self.record();
        Ok(())
    }

    fn remove_tree(&self, path: &Utf8Path) -> Result<(), ExecError> {
        self.check("remove_tree")?;
        self.tree.borrow_mut().retain(|p, _| !p.starts_with(path));
        self.record();
        Ok(())
    }

    fn create_symlink(&self, target: &Utf8Path, link: &Utf8Path) -> Result<(), ExecError> {
        self.check("create_symlink")?;
        {
            let mut tree = self.tree.borrow_mut();
            if tree.contains_key(link) {
                return Err(command_failed("ln", format!("{}: File exists", link)));
            }
            tree.insert(link.to_path_buf(), Node::Link(target.to_path_buf()));
        }
        self.record();
        Ok(())
    }

    fn atomic_rename(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError> {
        self.check("atomic_rename")?;
        {
            let mut tree = self.tree.borrow_mut();
            if !tree.contains_key(src) {
                return Err(command_failed(
                    "mv",
                    format!("{}: No such file or directory", src),
                ));
            }

            let moved: Vec<(Utf8PathBuf, Node)> = tree
                .iter()
                .filter(|(p, _)| p.starts_with(src))
                .map(|(p, node)| {
                    let rel = p
                        .strip_prefix(src)
                        .expect("filtered on prefix - this is a bug in shipway");
                    let dst_path = if rel.as_str().is_empty() {
                        dst.to_path_buf()
                    } else {
                        dst.join(rel)
                    };
                    (dst_path, node.clone())
                })
                .collect();

            // The whole replacement is one step: this models rename(2)
            // overwriting the destination atomically
            tree.retain(|p, _| !p.starts_with(src) && !p.starts_with(dst));
            tree.extend(moved);
        }
        self.record();
        Ok(())
    }

    fn exists(&self, path: &Utf8Path) -> Result<bool, ExecError> {
        self.check("exists")?;
        Ok(self.tree.borrow().contains_key(path))
    }
}

/// Config pointing at a fixed deployment root.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.target.root = Utf8PathBuf::from("/srv/app");
    config
}

/// Seed a release directory under the configured releases root.
pub fn seed_release(executor: &MemoryExecutor, config: &Config, id: &str) -> Utf8PathBuf {
    let path = config.releases_dir().join(id);
    executor.seed_dir(&path);
    path
}
