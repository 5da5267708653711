//! Error types for extsync-core.

use std::path::PathBuf;

use extsync_config::extension::StoreKind;
use extsync_dl::error::DownloadError;
use extsync_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

use crate::manifest::ManifestError;

/// Error raised while fetching or installing a single extension.
#[derive(Error, Diagnostic, Debug)]
pub enum ExtensionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    #[diagnostic(code(extsync::filesystem), help("Check file permissions and disk space"))]
    FileSystem(FileSystemError),

    #[error("Failed to read extension metadata from {}: {source}", .path.display())]
    #[diagnostic(
        code(extsync::manifest),
        help("The file is not a readable CRX or XPI package")
    )]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("Error while {action}")]
    #[diagnostic(code(extsync::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {store} extension identifier `{identifier}`: {reason}")]
    #[diagnostic(code(extsync::invalid_identifier))]
    InvalidIdentifier {
        store: StoreKind,
        identifier: String,
        reason: &'static str,
    },

    #[error("Unexpected {store} store response for `{identifier}`: {reason}")]
    #[diagnostic(code(extsync::invalid_response))]
    InvalidResponse {
        store: StoreKind,
        identifier: String,
        reason: String,
    },

    #[error("`{identifier}` is the same add-on as `{owner}` ({guid})")]
    #[diagnostic(
        code(extsync::duplicate_addon),
        help("Keep a single name for each add-on in the configuration")
    )]
    DuplicateAddon {
        identifier: String,
        owner: String,
        guid: String,
    },

    #[error("{operation} is not supported on this platform")]
    #[diagnostic(
        code(extsync::unsupported),
        help("This store cannot install into profiles on this system")
    )]
    Unsupported { operation: &'static str },

    #[error("No store registered for {0}")]
    #[diagnostic(code(extsync::store_unavailable))]
    StoreUnavailable(StoreKind),

    #[error("Worker task failed: {0}")]
    #[diagnostic(code(extsync::task))]
    TaskFailed(String),

    #[error("Failed to encode install record: {0}")]
    #[diagnostic(code(extsync::serialize))]
    Serialize(#[from] serde_json::Error),
}

impl From<FileSystemError> for ExtensionError {
    fn from(err: FileSystemError) -> Self {
        match err {
            FileSystemError::Unsupported { operation } => {
                Self::Unsupported {
                    operation,
                }
            }
            other => Self::FileSystem(other),
        }
    }
}

impl ExtensionError {
    /// Whether the failure comes from a missing platform capability rather than the extension.
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, ExtensionError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, ExtensionError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            ExtensionError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
