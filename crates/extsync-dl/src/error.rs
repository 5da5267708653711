use std::path::PathBuf;

use extsync_utils::error::{FileSystemError, HashError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    #[diagnostic(
        code(extsync_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(extsync_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("Invalid response from {url}: {reason}")]
    #[diagnostic(code(extsync_dl::invalid_response))]
    InvalidResponse { url: String, reason: String },

    #[error("Hash mismatch for {}! Expected {expected}, found {actual}", .path.display())]
    #[diagnostic(
        code(extsync_dl::checksum_mismatch),
        help("The upstream file may have changed during the transfer; try again")
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    #[diagnostic(code(extsync_dl::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(extsync_dl::filesystem))]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(extsync_dl::hash))]
    Hash(#[from] HashError),
}

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

impl DownloadError {
    /// Maps a transport error, turning rejected status codes into [`DownloadError::HttpError`].
    pub fn from_request(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => {
                Self::HttpError {
                    status,
                    url: url.to_string(),
                }
            }
            other => Self::from(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_http_error() {
        let err = DownloadError::HttpError {
            status: 404,
            url: "https://example.com/notfound".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: https://example.com/notfound");
    }

    #[test]
    fn test_from_request_status_code() {
        let err = DownloadError::from_request("https://x", ureq::Error::StatusCode(503));
        assert!(matches!(err, DownloadError::HttpError { status: 503, .. }));
    }

    #[test]
    fn test_from_ureq_error() {
        let err = DownloadError::from_request("https://x", ureq::Error::ConnectionFailed);
        assert!(matches!(err, DownloadError::Network(_)));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = DownloadError::ChecksumMismatch {
            path: PathBuf::from("/cache/a.xpi"),
            expected: "sha256:aa".into(),
            actual: "sha256:bb".into(),
        };
        assert_eq!(
            err.to_string(),
            "Hash mismatch for /cache/a.xpi! Expected sha256:aa, found sha256:bb"
        );
    }
}
