//! Error types for shipway

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::executor::ExecError;
use crate::release::ReleaseId;

/// Result type alias for shipway operations
pub type Result<T> = std::result::Result<T, Error>;

/// The step of a cutover at which a failure occurred.
///
/// The link step stages a new symbolic reference under a temporary name and
/// never touches `current`; only the rename step changes what `current`
/// resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoverStep {
    /// Creating the temporary symbolic reference
    Link,
    /// Atomically renaming the temporary reference onto `current`
    Rename,
}

impl std::fmt::Display for CutoverStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutoverStep::Link => write!(f, "link"),
            CutoverStep::Rename => write!(f, "rename"),
        }
    }
}

/// Main error type for shipway
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The releases root could not be listed or created
    #[error("Releases root unavailable: {path}")]
    #[diagnostic(help("Check that the deployment layout exists on the target; `shipway setup` creates it"))]
    ResourceUnavailable {
        /// Path that could not be accessed
        path: Utf8PathBuf,
        #[source]
        source: ExecError,
    },

    /// An operation required at least one release, but none exist
    #[error("No releases exist under the releases root")]
    #[diagnostic(help("Run `shipway deploy <source-tree>` to create the first release"))]
    EmptyReleaseSet,

    /// Copying the source tree into a new release directory failed
    #[error("Failed to copy source tree into release {id}")]
    #[diagnostic(help("The release directory may exist but be incomplete; inspect and remove it before retrying"))]
    CopyFailed {
        /// Identifier of the release whose directory may be incomplete
        id: ReleaseId,
        #[source]
        source: ExecError,
    },

    /// Repointing `current` failed
    #[error("Cutover failed at the {step} step")]
    #[diagnostic(help("`current` changed only if the rename step completed; retry the deploy or roll back"))]
    CutoverFailed {
        /// Which step failed: the `current` pointer is unchanged unless the
        /// rename step is the one that failed partway
        step: CutoverStep,
        #[source]
        source: ExecError,
    },

    /// Removing a path on the target failed
    #[error("Failed to remove {path}")]
    RemovalFailed {
        /// Path that could not be removed
        path: Utf8PathBuf,
        #[source]
        source: ExecError,
    },

    /// A string did not parse as a release identifier
    #[error("Invalid release identifier: {value}")]
    InvalidReleaseId {
        /// The rejected value
        value: String,
    },

    /// Another lifecycle operation holds the deploy lock
    #[error("Another lifecycle operation holds the lock at {path}")]
    #[diagnostic(help("Wait for the other operation to finish, or remove the lock directory if it is stale"))]
    LockHeld {
        /// The lock directory
        path: Utf8PathBuf,
    },

    /// The deploy lock could not be acquired for a reason other than contention
    #[error("Failed to acquire deploy lock at {path}")]
    #[diagnostic(help("Check that the deployment root exists; `shipway setup` creates it"))]
    LockFailed {
        /// The lock directory
        path: Utf8PathBuf,
        #[source]
        source: ExecError,
    },
}

impl Error {
    /// Create an invalid release identifier error
    pub fn invalid_release_id(value: impl Into<String>) -> Self {
        Self::InvalidReleaseId {
            value: value.into(),
        }
    }
}
