//! Releases listing command implementation

use miette::{IntoDiagnostic, Result};

use shipway_core::config::Config;
use shipway_core::executor::RemoteExecutor;
use shipway_core::store::ReleaseStore;

/// Run the releases command
pub fn run(executor: &dyn RemoteExecutor, config: &Config) -> Result<()> {
    let store = ReleaseStore::new(executor, config);
    let releases = store.list_releases().into_diagnostic()?;

    if releases.is_empty() {
        println!("No releases under {}", config.releases_dir());
        return Ok(());
    }

    for release in &releases {
        println!("{}", release.id);
    }
    Ok(())
}
