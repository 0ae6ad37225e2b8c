//! Configuration for a deployment target
//!
//! This module handles parsing of `shipway.toml`. A configuration value is
//! constructed once per invocation and passed by reference into each core
//! component; nothing mutates it afterwards.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Directory under the deployment root holding one subdirectory per release
pub const RELEASES_DIR: &str = "releases";

/// Name of the current pointer under the deployment root
pub const CURRENT_LINK: &str = "current";

/// Lock directory held for the duration of a lifecycle operation
pub const LOCK_DIR: &str = ".shipway-lock";

/// Release count `cleanup` falls back to when the caller passes 0
pub const DEFAULT_KEEP_RELEASES: usize = 5;

/// Main configuration structure for shipway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment target settings
    pub target: TargetConfig,

    /// Retention settings
    pub retention: RetentionConfig,
}

/// Deployment target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Deployment root on the target host (default: ".")
    pub root: Utf8PathBuf,

    /// SSH target as "user@host" or "user@host:port".
    /// Operations run against the local filesystem when unset.
    pub host: Option<String>,

    /// Connection timeout applied to each remote operation, in seconds
    /// (default: 10)
    pub connect_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            host: None,
            connect_timeout_secs: 10,
        }
    }
}

/// Retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Number of releases `cleanup` keeps when asked for the default
    /// (default: 5)
    pub keep_releases: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_releases: DEFAULT_KEEP_RELEASES,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// `<root>/releases`
    pub fn releases_dir(&self) -> Utf8PathBuf {
        self.target.root.join(RELEASES_DIR)
    }

    /// `<root>/current`
    pub fn current_link(&self) -> Utf8PathBuf {
        self.target.root.join(CURRENT_LINK)
    }

    /// `<root>/.shipway-lock`
    pub fn lock_dir(&self) -> Utf8PathBuf {
        self.target.root.join(LOCK_DIR)
    }
}
