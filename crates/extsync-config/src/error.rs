use std::path::PathBuf;

use extsync_utils::error::{FileSystemError, PathError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .path.display())]
    #[diagnostic(
        code(extsync_config::not_found),
        help("Create one with `extsync --defconfig` or point --config at an existing file")
    )]
    NotFound { path: PathBuf },

    #[error("Failed to read configuration file {}: {source}", .path.display())]
    #[diagnostic(code(extsync_config::read))]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(extsync_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {}", .path.display())]
    #[diagnostic(
        code(extsync_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists { path: PathBuf },

    #[error("Invalid profile path `{profile}`: {source}")]
    #[diagnostic(
        code(extsync_config::invalid_profile),
        help("Profiles must be non-empty paths; referenced environment variables must be set")
    )]
    InvalidProfile {
        profile: String,
        #[source]
        source: PathError,
    },

    #[error("Empty extension name in entry for profile `{profile}`")]
    #[diagnostic(code(extsync_config::empty_identifier))]
    EmptyIdentifier { profile: String },

    #[error("parallel_limit must be at least 1")]
    #[diagnostic(code(extsync_config::invalid_parallel_limit))]
    InvalidParallelLimit,

    #[error("Invalid URL for `{key}`: {url}")]
    #[diagnostic(
        code(extsync_config::invalid_base_url),
        help("Base URLs must start with http:// or https://")
    )]
    InvalidBaseUrl { key: &'static str, url: String },

    #[error(transparent)]
    #[diagnostic(code(extsync_config::path))]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(code(extsync_config::filesystem))]
    FileSystem(#[from] FileSystemError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
