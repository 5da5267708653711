use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use extsync_config::{config::Config, extension::StoreKind};

use crate::ExtensionResult;

mod chromium;
mod firefox;

pub use chromium::{ChromiumStore, ExternalExtension};
pub use firefox::FirefoxStore;

/// Result of a successful install into one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// The profile was changed.
    Installed,
    /// The profile already referenced this artifact.
    Skipped,
}

/// An upstream extension store together with the way its packages are installed into profiles.
///
/// Both operations block on network or filesystem I/O.
pub trait ExtensionStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Makes the latest package for `identifier` available in `cache_dir` and returns its path.
    ///
    /// A package that is already current is returned without being downloaded again.
    fn fetch(&self, identifier: &str, cache_dir: &Path) -> ExtensionResult<PathBuf>;

    /// Installs `artifact` into the profile at `profile`.
    ///
    /// Repeating an install with the same inputs returns [`InstallStatus::Skipped`] and leaves
    /// the profile untouched.
    fn install(&self, artifact: &Path, profile: &Path) -> ExtensionResult<InstallStatus>;
}

pub type StoreHandle = Arc<dyn ExtensionStore>;

/// Builds the stores for every [`StoreKind`] from the configured upstream URLs.
///
/// With `refresh`, cached Chromium packages are downloaded again.
pub fn default_stores(config: &Config, refresh: bool) -> Vec<StoreHandle> {
    vec![
        Arc::new(ChromiumStore::new(config.google_base_url()).refresh(refresh)),
        Arc::new(FirefoxStore::new(config.mozilla_base_url())),
    ]
}
