use std::{
    fs,
    path::{Path, PathBuf},
};

use extsync_config::extension::StoreKind;
use extsync_dl::download::Download;
use extsync_utils::fs::{ensure_dir_exists, replace_file, safe_remove};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ExtensionStore, InstallStatus};
use crate::{
    error::{ErrorContext, ExtensionError},
    manifest::read_manifest,
    ExtensionResult,
};

const EXTERNAL_EXTENSIONS_DIR: &str = "External Extensions";
const EXTENSION_ID_LEN: usize = 32;

/// Record Chromium reads from `<profile>/External Extensions/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExternalExtension {
    pub external_crx: String,
    pub external_version: String,
}

/// Chrome Web Store, keyed by 32-character extension IDs.
///
/// The update service only answers with a redirect to the newest package, so a cached package
/// is reused as long as it is readable; [`ChromiumStore::refresh`] forces a new download.
pub struct ChromiumStore {
    base_url: String,
    refresh: bool,
}

impl ChromiumStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh: false,
        }
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn download_url(&self, id: &str) -> String {
        format!(
            "{}/service/update2/crx?response=redirect&os=linux&arch=x64&os_arch=x86_64\
             &nacl_arch=x86-64&prod=chromium&prodchannel=unknown&prodversion=91.0.4442.4\
             &lang=en-US&acceptformat=crx2,crx3&x=id%3D{id}%26installsource%3Dondemand%26uc",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn validate_extension_id(id: &str) -> ExtensionResult<()> {
    let invalid = |reason| {
        ExtensionError::InvalidIdentifier {
            store: StoreKind::Chromium,
            identifier: id.to_string(),
            reason,
        }
    };

    if id.len() != EXTENSION_ID_LEN {
        return Err(invalid("expected 32 characters"));
    }
    if !id.bytes().all(|b| (b'a'..=b'p').contains(&b)) {
        return Err(invalid("only the letters a-p are allowed"));
    }
    Ok(())
}

fn read_record(path: &Path) -> Option<ExternalExtension> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

impl ExtensionStore for ChromiumStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Chromium
    }

    fn fetch(&self, identifier: &str, cache_dir: &Path) -> ExtensionResult<PathBuf> {
        validate_extension_id(identifier)?;
        ensure_dir_exists(cache_dir)?;

        let dest = cache_dir.join(format!("{identifier}.crx"));

        if dest.is_file() && !self.refresh {
            match read_manifest(&dest) {
                Ok(manifest) => {
                    debug!("{identifier}: using cached {manifest}");
                    return Ok(dest);
                }
                Err(err) => debug!("{identifier}: cached package unreadable ({err})"),
            }
        }

        info!("Downloading {identifier}");

        let staged = cache_dir.join(format!("{identifier}.crx.new"));
        Download::new(self.download_url(identifier), &staged).execute()?;

        let manifest = match read_manifest(&staged) {
            Ok(manifest) => manifest,
            Err(source) => {
                safe_remove(&staged)?;
                return Err(ExtensionError::Manifest {
                    path: staged,
                    source,
                });
            }
        };

        replace_file(&staged, &dest)?;
        info!("Downloaded {manifest} ({identifier})");

        Ok(dest)
    }

    fn install(&self, artifact: &Path, profile: &Path) -> ExtensionResult<InstallStatus> {
        let manifest = read_manifest(artifact).map_err(|source| {
            ExtensionError::Manifest {
                path: artifact.to_path_buf(),
                source,
            }
        })?;

        let stem = artifact
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| manifest.name.clone());

        let record_dir = profile.join(EXTERNAL_EXTENSIONS_DIR);
        let record_path = record_dir.join(format!("{stem}.json"));
        let record = ExternalExtension {
            external_crx: artifact.to_string_lossy().into_owned(),
            external_version: manifest.version.clone(),
        };

        match read_record(&record_path) {
            Some(existing) if existing == record => {
                debug!("{manifest} already installed in {}", profile.display());
                return Ok(InstallStatus::Skipped);
            }
            Some(existing) => {
                info!(
                    "Updating {} {} -> {} in {}",
                    manifest.name,
                    existing.external_version,
                    manifest.version,
                    profile.display()
                );
            }
            None => info!("Installing new {manifest} in {}", profile.display()),
        }

        ensure_dir_exists(&record_dir)?;
        let content = serde_json::to_string_pretty(&record)?;
        fs::write(&record_path, content)
            .with_context(|| format!("writing {}", record_path.display()))?;

        Ok(InstallStatus::Installed)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::test_utils::{crx3_bytes, manifest_json, zip_bytes};

    const ID: &str = "cjpalhdlnbpafiamejdnhcphjbkeiagm";

    fn write_package(dir: &Path, name: &str, version: &str) -> PathBuf {
        let path = dir.join(format!("{ID}.crx"));
        fs::write(&path, crx3_bytes(&manifest_json(name, version))).unwrap();
        path
    }

    fn record_in(profile: &Path) -> ExternalExtension {
        let path = profile.join(EXTERNAL_EXTENSIONS_DIR).join(format!("{ID}.json"));
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_validate_extension_id() {
        assert!(validate_extension_id(ID).is_ok());
        assert!(validate_extension_id("short").is_err());
        assert!(validate_extension_id("zjpalhdlnbpafiamejdnhcphjbkeiagm").is_err());
        assert!(validate_extension_id("CJPALHDLNBPAFIAMEJDNHCPHJBKEIAGM").is_err());
    }

    #[test]
    fn test_download_url() {
        let store = ChromiumStore::new("https://clients2.google.com/");
        let url = store.download_url(ID);
        assert!(url.starts_with("https://clients2.google.com/service/update2/crx?response=redirect&"));
        assert!(url.contains("&acceptformat=crx2,crx3&"));
        assert!(url.ends_with(&format!("x=id%3D{ID}%26installsource%3Dondemand%26uc")));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_install_update_and_skip() {
        let cache = tempdir().unwrap();
        let profile = tempdir().unwrap();
        let store = ChromiumStore::new("http://unused");

        let artifact = write_package(cache.path(), "uBlock Origin", "2.0");
        assert_eq!(
            store.install(&artifact, profile.path()).unwrap(),
            InstallStatus::Installed
        );
        assert_eq!(
            record_in(profile.path()),
            ExternalExtension {
                external_crx: artifact.to_string_lossy().into_owned(),
                external_version: "2.0".into(),
            }
        );

        let record_path = profile
            .path()
            .join(EXTERNAL_EXTENSIONS_DIR)
            .join(format!("{ID}.json"));
        let modified = fs::metadata(&record_path).unwrap().modified().unwrap();
        assert_eq!(
            store.install(&artifact, profile.path()).unwrap(),
            InstallStatus::Skipped
        );
        assert_eq!(
            fs::metadata(&record_path).unwrap().modified().unwrap(),
            modified
        );

        write_package(cache.path(), "uBlock Origin", "2.1");
        assert_eq!(
            store.install(&artifact, profile.path()).unwrap(),
            InstallStatus::Installed
        );
        assert_eq!(record_in(profile.path()).external_version, "2.1");
    }

    #[test]
    fn test_install_overwrites_corrupt_record() {
        let cache = tempdir().unwrap();
        let profile = tempdir().unwrap();
        let store = ChromiumStore::new("http://unused");
        let artifact = write_package(cache.path(), "x", "1.0");

        let record_dir = profile.path().join(EXTERNAL_EXTENSIONS_DIR);
        fs::create_dir_all(&record_dir).unwrap();
        fs::write(record_dir.join(format!("{ID}.json")), "{not json").unwrap();

        assert_eq!(
            store.install(&artifact, profile.path()).unwrap(),
            InstallStatus::Installed
        );
        assert_eq!(record_in(profile.path()).external_version, "1.0");
    }

    #[test]
    fn test_install_unreadable_artifact() {
        let cache = tempdir().unwrap();
        let profile = tempdir().unwrap();
        let artifact = cache.path().join(format!("{ID}.crx"));
        fs::write(&artifact, "garbage").unwrap();

        let result = ChromiumStore::new("http://unused").install(&artifact, profile.path());
        assert!(matches!(result, Err(ExtensionError::Manifest { .. })));
        assert!(!profile.path().join(EXTERNAL_EXTENSIONS_DIR).exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/update2/crx"))
            .and(query_param("response", "redirect"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/crx/{ID}_2_0.crx", server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/crx/{ID}_2_0.crx")))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(crx3_bytes(&manifest_json("x", "2.0"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = tempdir().unwrap();
        let cache_dir = cache.path().join("chromium");
        let store = ChromiumStore::new(server.uri());

        let dir = cache_dir.clone();
        let artifact = tokio::task::spawn_blocking(move || {
            let first = store.fetch(ID, &dir).unwrap();
            let second = store.fetch(ID, &dir).unwrap();
            assert_eq!(first, second);
            first
        })
        .await
        .unwrap();

        assert_eq!(artifact, cache_dir.join(format!("{ID}.crx")));
        assert_eq!(read_manifest(&artifact).unwrap().version, "2.0");
        assert!(!cache_dir.join(format!("{ID}.crx.new")).exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_downloads_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/update2/crx"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(zip_bytes(&manifest_json("x", "3.0"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = tempdir().unwrap();
        write_package(cache.path(), "x", "2.0");

        let store = ChromiumStore::new(server.uri()).refresh(true);
        let dir = cache.path().to_path_buf();
        let artifact = tokio::task::spawn_blocking(move || store.fetch(ID, &dir))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read_manifest(&artifact).unwrap().version, "3.0");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_rejects_invalid_package_and_keeps_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/update2/crx"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;

        let cache = tempdir().unwrap();
        let previous = write_package(cache.path(), "x", "2.0");

        let store = ChromiumStore::new(server.uri()).refresh(true);
        let dir = cache.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || store.fetch(ID, &dir))
            .await
            .unwrap();

        let staged = cache.path().join(format!("{ID}.crx.new"));
        match result {
            Err(ExtensionError::Manifest { path, .. }) => assert_eq!(path, staged),
            other => panic!("expected a manifest error, got {other:?}"),
        }
        assert_eq!(read_manifest(&previous).unwrap().version, "2.0");
        assert!(!staged.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = tempdir().unwrap();
        let store = ChromiumStore::new(server.uri());
        let dir = cache.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || store.fetch(ID, &dir))
            .await
            .unwrap();

        assert!(matches!(result, Err(ExtensionError::Download(_))));
        assert!(!cache.path().join(format!("{ID}.crx")).exists());
    }

    #[test]
    fn test_fetch_invalid_identifier_does_no_io() {
        let cache = tempdir().unwrap();
        let dir = cache.path().join("never-created");
        let result = ChromiumStore::new("http://unused").fetch("../../etc/passwd", &dir);
        assert!(matches!(
            result,
            Err(ExtensionError::InvalidIdentifier { .. })
        ));
        assert!(!dir.exists());
    }
}
