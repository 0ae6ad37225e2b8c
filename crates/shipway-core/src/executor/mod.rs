//! Remote execution of filesystem operations on the deployment target
//!
//! The lifecycle core never builds shell command strings; it calls the typed
//! operations on [`RemoteExecutor`] with structured arguments. Two
//! implementations are provided: [`LocalExecutor`] operates on the local
//! filesystem directly, [`SshExecutor`] runs one `ssh` invocation per
//! operation against a remote host.
//!
//! **Note**: This module uses Unix-specific functionality (symbolic links,
//! atomic rename-over) and is designed for use on Linux deployment targets.

mod local;
mod ssh;

pub use local::LocalExecutor;
pub use ssh::SshExecutor;

use camino::Utf8Path;
use thiserror::Error;

/// Error from a single executor operation
#[derive(Debug, Error)]
pub enum ExecError {
    /// I/O error from a local filesystem operation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote command exited with a non-zero status
    #[error("{op} exited with status {status}: {stderr}")]
    CommandFailed {
        /// The operation that failed
        op: String,
        /// Exit status of the remote command
        status: i32,
        /// Captured stderr, trimmed
        stderr: String,
    },

    /// A path on the target is not valid UTF-8
    #[error("Path is not valid UTF-8: {path:?}")]
    NonUtf8Path {
        /// The offending path
        path: std::path::PathBuf,
    },
}

/// Filesystem operations against a deployment target.
///
/// All paths are paths on the target host. Implementations must make
/// [`atomic_rename`](RemoteExecutor::atomic_rename) atomic with respect to
/// concurrent readers of the destination; every ordering guarantee the
/// lifecycle core offers rests on that primitive.
pub trait RemoteExecutor {
    /// Names of the entries directly under `path`
    fn list_directory(&self, path: &Utf8Path) -> Result<Vec<String>, ExecError>;

    /// Create `path` and any missing ancestors; succeeds if it already exists
    fn make_directory(&self, path: &Utf8Path) -> Result<(), ExecError>;

    /// Create a single directory, failing if `path` already exists.
    ///
    /// The failure-if-present behavior is relied on as an atomic
    /// test-and-set by the deploy lock.
    fn create_directory(&self, path: &Utf8Path) -> Result<(), ExecError>;

    /// Recursively copy the tree at `src` to `dst`
    fn copy_tree(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError>;

    /// Recursively remove `path`; succeeds if it does not exist
    fn remove_tree(&self, path: &Utf8Path) -> Result<(), ExecError>;

    /// Create a symbolic link at `link` pointing to `target`
    fn create_symlink(&self, target: &Utf8Path, link: &Utf8Path) -> Result<(), ExecError>;

    /// Rename `src` to `dst`, atomically replacing `dst` if present
    fn atomic_rename(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError>;

    /// Whether `path` exists (without following a symbolic link at `path`)
    fn exists(&self, path: &Utf8Path) -> Result<bool, ExecError>;
}
