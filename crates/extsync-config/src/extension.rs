use std::{fmt, path::PathBuf};

use extsync_utils::path::resolve_path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Upstream store an extension is distributed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Chrome Web Store; identifiers are 32-character extension IDs.
    Chromium,
    /// addons.mozilla.org; identifiers are add-on slugs.
    Firefox,
}

impl StoreKind {
    pub const ALL: [StoreKind; 2] = [StoreKind::Chromium, StoreKind::Firefox];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Chromium => "chromium",
            StoreKind::Firefox => "firefox",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `[[extensions]]` entry: the extensions wanted in one browser profile.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtensionEntry {
    /// Store the extensions are fetched from.
    pub browser: StoreKind,

    /// Profile directory. `~`, `$VAR` and `${VAR}` are expanded.
    pub profile: String,

    /// Extension identifiers (IDs for chromium, slugs for firefox).
    #[serde(default)]
    pub names: Vec<String>,
}

impl ExtensionEntry {
    pub fn profile_path(&self) -> Result<PathBuf> {
        resolve_path(&self.profile).map_err(|err| {
            ConfigError::InvalidProfile {
                profile: self.profile.clone(),
                source: err,
            }
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.profile_path()?;

        if self.names.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::EmptyIdentifier {
                profile: self.profile.clone(),
            });
        }

        Ok(())
    }
}
