use std::{
    ffi::OsString,
    fs::File,
    io::{Read as _, Write as _},
    path::{Path, PathBuf},
};

use extsync_utils::{
    fs::{ensure_dir_exists, replace_file, safe_remove},
    hash::{Checksum, StreamHasher},
};
use tracing::debug;
use ureq::{
    http::{header::CONTENT_LENGTH, Response},
    Body,
};

use crate::{error::DownloadError, http::Http, types::Progress};

pub struct Download {
    pub url: String,
    pub output: PathBuf,
    pub checksum: Option<Checksum>,
    pub on_progress: Option<Box<dyn Fn(Progress) + Send + Sync>>,
}

impl Download {
    /// Creates a download of `url` into `output`, without checksum verification or progress
    /// reporting.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use extsync_dl::download::Download;
    ///
    /// let path = Download::new("https://example.com/addon.xpi", "/tmp/addon.xpi")
    ///     .execute()
    ///     .unwrap();
    /// assert!(path.ends_with("addon.xpi"));
    /// ```
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            checksum: None,
            on_progress: None,
        }
    }

    /// Verify the downloaded bytes against `checksum` before the file is put in place.
    pub fn checksum(mut self, checksum: Option<Checksum>) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// Performs the download and returns the output path.
    ///
    /// The body is streamed into `<output>.part` next to the destination and renamed over the
    /// destination only once the transfer is complete and, when a checksum was given, verified.
    /// An existing file at the destination is left untouched unless the download succeeds. On
    /// any failure the partial file is removed.
    pub fn execute(self) -> Result<PathBuf, DownloadError> {
        if let Some(parent) = self.output.parent() {
            ensure_dir_exists(parent)?;
        }

        let part_path = part_path(&self.output);

        match self.download_to_file(&part_path) {
            Ok(()) => {
                replace_file(&part_path, &self.output)?;
                debug!("downloaded {} to {}", self.url, self.output.display());
                Ok(self.output)
            }
            Err(err) => {
                if let Err(cleanup) = safe_remove(&part_path) {
                    debug!("failed to remove partial download: {cleanup}");
                }
                Err(err)
            }
        }
    }

    fn download_to_file(&self, path: &Path) -> Result<(), DownloadError> {
        let resp = Http::fetch(&self.url)?;
        let total = Self::parse_content_length(&resp);

        if let Some(ref cb) = self.on_progress {
            cb(Progress::Starting {
                total,
            });
        }

        let write_failed = |err| {
            DownloadError::Write {
                path: path.to_path_buf(),
                source: err,
            }
        };

        let mut file = File::create(path).map_err(write_failed)?;
        let mut hasher = self
            .checksum
            .as_ref()
            .map(|checksum| StreamHasher::new(checksum.algorithm));

        let mut reader = resp.into_body().into_reader();
        let mut buffer = [0u8; 8192];
        let mut downloaded = 0u64;

        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|err| DownloadError::from(ureq::Error::Io(err)))?;
            if n == 0 {
                break;
            }

            file.write_all(&buffer[..n]).map_err(write_failed)?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&buffer[..n]);
            }
            downloaded += n as u64;

            if let Some(ref cb) = self.on_progress {
                cb(Progress::Chunk {
                    current: downloaded,
                    total,
                });
            }
        }

        file.sync_all().map_err(write_failed)?;

        if let (Some(expected), Some(hasher)) = (&self.checksum, hasher) {
            let actual = hasher.finalize_hex();
            if !expected.matches(&actual) {
                return Err(DownloadError::ChecksumMismatch {
                    path: self.output.clone(),
                    expected: expected.to_string(),
                    actual: format!("{}:{actual}", expected.algorithm),
                });
            }
        }

        if let Some(ref cb) = self.on_progress {
            cb(Progress::Complete {
                total: downloaded,
            });
        }

        Ok(())
    }

    fn parse_content_length(resp: &Response<Body>) -> u64 {
        resp.headers()
            .get(CONTENT_LENGTH)
            .and_then(|h| h.to_str().ok())
            .and_then(|len| len.parse::<u64>().ok())
            .unwrap_or(0)
    }
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    output.with_file_name(name)
}
