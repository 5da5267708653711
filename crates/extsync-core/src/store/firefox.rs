use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use extsync_config::extension::StoreKind;
use extsync_dl::{download::Download, http::Http};
use extsync_utils::{
    fs::{create_symlink, ensure_dir_exists, read_link_target, replace_file, safe_remove},
    hash::Checksum,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{ExtensionStore, InstallStatus};
use crate::{error::ExtensionError, manifest::read_manifest, ExtensionResult};

const EXTENSIONS_DIR: &str = "extensions";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Deserialize)]
struct AddonDetail {
    guid: String,
    current_version: AddonVersion,
}

#[derive(Debug, Deserialize)]
struct AddonVersion {
    version: String,
    files: Vec<AddonFile>,
}

#[derive(Debug, Deserialize)]
struct AddonFile {
    url: String,
    hash: Option<String>,
}

/// addons.mozilla.org, keyed by add-on slugs.
///
/// Packages are cached as `<guid>.xpi` and linked into `<profile>/extensions`.
/// The registry also answers to numeric ids and guids, so two configured names can resolve to
/// one add-on; only the first name to resolve a guid may fetch it.
pub struct FirefoxStore {
    base_url: String,
    claims: Mutex<HashMap<String, String>>,
}

impl FirefoxStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            claims: Mutex::new(HashMap::new()),
        }
    }

    pub fn addon_url(&self, slug: &str) -> String {
        format!(
            "{}/api/v4/addons/addon/{}/",
            self.base_url.trim_end_matches('/'),
            utf8_percent_encode(slug, PATH_SEGMENT)
        )
    }

    /// Records `identifier` as the owner of `guid`, failing if another name already owns it.
    fn claim(&self, guid: &str, identifier: &str) -> ExtensionResult<()> {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        match claims.get(guid) {
            Some(owner) if owner != identifier => {
                Err(ExtensionError::DuplicateAddon {
                    identifier: identifier.to_string(),
                    owner: owner.clone(),
                    guid: guid.to_string(),
                })
            }
            Some(_) => Ok(()),
            None => {
                claims.insert(guid.to_string(), identifier.to_string());
                Ok(())
            }
        }
    }
}

fn invalid_response(slug: &str, reason: impl Into<String>) -> ExtensionError {
    ExtensionError::InvalidResponse {
        store: StoreKind::Firefox,
        identifier: slug.to_string(),
        reason: reason.into(),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

impl ExtensionStore for FirefoxStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Firefox
    }

    fn fetch(&self, identifier: &str, cache_dir: &Path) -> ExtensionResult<PathBuf> {
        let detail: AddonDetail = Http::json(&self.addon_url(identifier))?;

        if !is_plain_file_name(&detail.guid) {
            return Err(invalid_response(
                identifier,
                format!("unusable guid `{}`", detail.guid),
            ));
        }
        self.claim(&detail.guid, identifier)?;

        let upstream = &detail.current_version.version;
        let file = detail
            .current_version
            .files
            .first()
            .ok_or_else(|| invalid_response(identifier, "no downloadable files"))?;

        ensure_dir_exists(cache_dir)?;
        let dest = cache_dir.join(format!("{}.xpi", detail.guid));

        if dest.is_file() {
            match read_manifest(&dest) {
                Ok(local) if &local.version == upstream => {
                    debug!("{identifier}: {local} is up-to-date");
                    return Ok(dest);
                }
                Ok(local) => {
                    info!(
                        "Updating {identifier} {} -> {upstream}",
                        local.version
                    )
                }
                Err(err) => {
                    warn!("{identifier}: cached package unreadable ({err}), downloading again")
                }
            }
        } else {
            info!("Downloading {identifier} {upstream}");
        }

        let checksum = match file.hash.as_deref().map(Checksum::parse) {
            Some(Ok(checksum)) => Some(checksum),
            Some(Err(err)) => {
                warn!("{identifier}: {err}, skipping verification");
                None
            }
            None => None,
        };

        Download::new(&file.url, &dest)
            .checksum(checksum)
            .execute()?;

        Ok(dest)
    }

    fn install(&self, artifact: &Path, profile: &Path) -> ExtensionResult<InstallStatus> {
        let file_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ExtensionError::IoError {
                    action: format!("resolving file name of {}", artifact.display()),
                    source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
                }
            })?;

        let extensions_dir = profile.join(EXTENSIONS_DIR);
        let link = extensions_dir.join(&file_name);

        if read_link_target(&link).as_deref() == Some(artifact) {
            debug!("{file_name} already linked in {}", profile.display());
            return Ok(InstallStatus::Skipped);
        }

        ensure_dir_exists(&extensions_dir)?;

        let staged = extensions_dir.join(format!(".{file_name}.tmp"));
        safe_remove(&staged)?;
        create_symlink(artifact, &staged)?;

        if let Err(err) = replace_file(&staged, &link) {
            if let Err(cleanup) = safe_remove(&staged) {
                debug!("failed to remove staged link: {cleanup}");
            }
            return Err(err.into());
        }

        info!("Linked {file_name} into {}", profile.display());
        Ok(InstallStatus::Installed)
    }
}
