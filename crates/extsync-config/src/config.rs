use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use extsync_utils::{
    error::FileSystemError,
    fs::ensure_dir_exists,
    path::{resolve_path, xdg_config_home, xdg_data_home},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{ConfigError, Result},
    extension::ExtensionEntry,
};

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://clients2.google.com";
pub const DEFAULT_MOZILLA_BASE_URL: &str = "https://services.addons.mozilla.org";
pub const DEFAULT_PARALLEL_LIMIT: usize = 4;

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# extsync configuration

# Directory where downloaded extensions are cached.
# Default: $XDG_DATA_HOME/extsync
# extensions_dir = "~/.local/share/extsync"

# Maximum number of downloads and installs running at once.
# Default: 4
# parallel_limit = 4

# Global timeout for a single HTTP request, in seconds.
# http_timeout = 60

# Upstream overrides, e.g. for mirrors.
# base_url_google = "https://clients2.google.com"
# base_url_mozilla = "https://services.addons.mozilla.org"

[[extensions]]
browser = "firefox"
profile = "~/.mozilla/firefox/default"
names = ["ublock-origin"]

[[extensions]]
browser = "chromium"
profile = "~/.config/chromium/Default"
names = ["cjpalhdlnbpafiamejdnhcphjbkeiagm"]
"#;

/// Application's configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Directory where downloaded extensions are cached.
    /// Default: $XDG_DATA_HOME/extsync
    pub extensions_dir: Option<String>,

    /// Maximum number of concurrent downloads and installs.
    /// Default: 4
    pub parallel_limit: Option<usize>,

    /// Global per-request HTTP timeout, in seconds.
    pub http_timeout: Option<u64>,

    /// Base URL of the Chrome Web Store update service.
    pub base_url_google: Option<String>,

    /// Base URL of the addons.mozilla.org API.
    pub base_url_mozilla: Option<String>,

    /// Extensions to keep synchronized, one entry per profile and store.
    #[serde(default)]
    pub extensions: Vec<ExtensionEntry>,
}

/// Returns the configuration path, honouring `EXTSYNC_CONFIG`.
pub fn default_config_path() -> PathBuf {
    match std::env::var("EXTSYNC_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("extsync").join("config.toml"),
    }
}

impl Config {
    /// Loads and validates the configuration file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source: err,
                }
            }
        })?;

        let mut config: Config = toml::from_str(&content)?;
        config.resolve()?;

        debug!(
            "loaded {} extension entries from {}",
            config.extensions.len(),
            path.display()
        );

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        if *self.parallel_limit.get_or_insert(DEFAULT_PARALLEL_LIMIT) == 0 {
            return Err(ConfigError::InvalidParallelLimit);
        }

        validate_base_url("base_url_google", self.base_url_google.as_deref())?;
        validate_base_url("base_url_mozilla", self.base_url_mozilla.as_deref())?;

        self.get_extensions_dir()?;

        for entry in &self.extensions {
            entry.validate()?;
        }

        Ok(())
    }

    pub fn get_extensions_dir(&self) -> Result<PathBuf> {
        match &self.extensions_dir {
            Some(dir) => Ok(resolve_path(dir)?),
            None => Ok(xdg_data_home().join("extsync")),
        }
    }

    pub fn get_parallel_limit(&self) -> usize {
        self.parallel_limit.unwrap_or(DEFAULT_PARALLEL_LIMIT).max(1)
    }

    pub fn get_http_timeout(&self) -> Option<Duration> {
        self.http_timeout.map(Duration::from_secs)
    }

    pub fn google_base_url(&self) -> &str {
        self.base_url_google
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_GOOGLE_BASE_URL)
    }

    pub fn mozilla_base_url(&self) -> &str {
        self.base_url_mozilla
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_MOZILLA_BASE_URL)
    }
}

fn validate_base_url(key: &'static str, url: Option<&str>) -> Result<()> {
    match url {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            Err(ConfigError::InvalidBaseUrl {
                key,
                url: url.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Writes a commented example configuration to `path`, refusing to overwrite.
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config_path = path.as_ref();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists {
            path: config_path.to_path_buf(),
        });
    }

    if let Some(parent) = config_path.parent() {
        ensure_dir_exists(parent)?;
    }

    fs::write(config_path, DEFAULT_CONFIG_TEMPLATE).map_err(|err| {
        FileSystemError::File {
            path: config_path.to_path_buf(),
            action: "write",
            source: err,
        }
    })?;

    info!(
        "Default configuration file generated at: {}",
        config_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    use crate::{extension::StoreKind, test_utils::with_env};

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_load_config() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            extensions_dir = "/var/cache/extsync"
            parallel_limit = 2
            base_url_mozilla = "http://127.0.0.1:8080/"

            [[extensions]]
            browser = "firefox"
            profile = "/profiles/ff"
            names = ["ublock-origin", "vimium-ff"]

            [[extensions]]
            browser = "chromium"
            profile = "/profiles/chromium"
            names = ["cjpalhdlnbpafiamejdnhcphjbkeiagm"]
            "#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.extensions.len(), 2);
        assert_eq!(config.get_parallel_limit(), 2);
        assert_eq!(config.mozilla_base_url(), "http://127.0.0.1:8080");
        assert_eq!(config.google_base_url(), DEFAULT_GOOGLE_BASE_URL);
        assert_eq!(
            config.get_extensions_dir().unwrap(),
            PathBuf::from("/var/cache/extsync")
        );
    }

    #[test]
    #[serial]
    fn test_resolve_sets_defaults() {
        with_env(&[("XDG_DATA_HOME", "/tmp/data")], &[], || {
            let mut config = Config::default();
            config.resolve().unwrap();
            assert_eq!(config.parallel_limit, Some(DEFAULT_PARALLEL_LIMIT));
            assert_eq!(
                config.get_extensions_dir().unwrap(),
                PathBuf::from("/tmp/data/extsync")
            );
            assert_eq!(config.get_http_timeout(), None);
        });
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[[extensions]\nbrowser = ");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    fn test_load_unknown_browser() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [[extensions]]
            browser = "opera"
            profile = "/p"
            names = ["x"]
            "#,
        );
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    fn test_zero_parallel_limit_rejected() {
        let mut config = Config {
            parallel_limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidParallelLimit)
        ));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = Config {
            base_url_google: Some("clients2.google.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidBaseUrl {
                key: "base_url_google",
                ..
            })
        ));
    }

    #[test]
    #[serial]
    fn test_unset_variable_in_profile_is_fatal() {
        with_env(&[], &["EXTSYNC_UNSET_PROFILE_ROOT"], || {
            let mut config = Config {
                extensions: vec![ExtensionEntry {
                    browser: StoreKind::Firefox,
                    profile: "$EXTSYNC_UNSET_PROFILE_ROOT/ff".into(),
                    names: vec!["a".into()],
                }],
                ..Default::default()
            };
            assert!(matches!(
                config.resolve(),
                Err(ConfigError::InvalidProfile { .. })
            ));
        });
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        with_env(&[("EXTSYNC_CONFIG", "/custom/extsync.toml")], &[], || {
            assert_eq!(
                default_config_path(),
                PathBuf::from("/custom/extsync.toml")
            );
        });

        with_env(
            &[("XDG_CONFIG_HOME", "/tmp/xdg")],
            &["EXTSYNC_CONFIG"],
            || {
                assert_eq!(
                    default_config_path(),
                    PathBuf::from("/tmp/xdg/extsync/config.toml")
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_generate_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        with_env(&[("HOME", "/home/tester")], &[], || {
            generate_default_config(&path).unwrap();
            let config = Config::load(&path).unwrap();
            assert_eq!(config.extensions.len(), 2);
            assert_eq!(
                config.extensions[0].profile_path().unwrap(),
                PathBuf::from("/home/tester/.mozilla/firefox/default")
            );
        });

        assert!(matches!(
            generate_default_config(&path),
            Err(ConfigError::ConfigAlreadyExists { .. })
        ));
    }
}
