//! Reads the `manifest.json` record embedded in extension packages.
//!
//! Firefox add-ons (`.xpi`) are plain zip archives. Chromium packages (`.crx`) wrap a zip
//! archive in a `Cr24` container whose header is skipped before the archive is opened.

use std::{
    fmt, fs,
    io::{Cursor, Read},
    path::Path,
};

use serde::Deserialize;
use thiserror::Error;

const CRX_MAGIC: &[u8; 4] = b"Cr24";
const MANIFEST_NAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read package: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CRX header: {0}")]
    InvalidCrxHeader(String),

    #[error("not a zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("package has no manifest.json")]
    MissingManifest,

    #[error("invalid manifest.json: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Name and version declared by a package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Reads the manifest of the package at `path`.
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Manifest, ManifestError> {
    let data = fs::read(path)?;
    parse_manifest(&data)
}

/// Reads the manifest from an in-memory package.
pub fn parse_manifest(data: &[u8]) -> Result<Manifest, ManifestError> {
    let archive = strip_crx_header(data)?;
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;

    let mut entry = match zip.by_name(MANIFEST_NAME) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ManifestError::MissingManifest),
        Err(err) => return Err(err.into()),
    };

    let mut raw = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut raw)?;

    let json = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&raw);
    Ok(serde_json::from_slice(json)?)
}

/// Returns the zip payload of a CRX2/CRX3 container, or `data` unchanged if it is not one.
fn strip_crx_header(data: &[u8]) -> Result<&[u8], ManifestError> {
    if !data.starts_with(CRX_MAGIC) {
        return Ok(data);
    }

    let mut offset = CRX_MAGIC.len();
    let version = read_u32(data, &mut offset)?;

    let header_len = match version {
        2 => {
            let key_len = read_u32(data, &mut offset)? as usize;
            let sig_len = read_u32(data, &mut offset)? as usize;
            key_len.saturating_add(sig_len)
        }
        3 => read_u32(data, &mut offset)? as usize,
        other => {
            return Err(ManifestError::InvalidCrxHeader(format!(
                "unsupported version {other}"
            )))
        }
    };

    data.get(offset.saturating_add(header_len)..)
        .ok_or_else(|| ManifestError::InvalidCrxHeader("header exceeds file size".into()))
}

fn read_u32(data: &[u8], offset: &mut usize) -> Result<u32, ManifestError> {
    let bytes: [u8; 4] = data
        .get(*offset..*offset + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| ManifestError::InvalidCrxHeader("truncated header".into()))?;
    *offset += 4;
    Ok(u32::from_le_bytes(bytes))
}
