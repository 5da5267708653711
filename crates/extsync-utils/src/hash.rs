use std::{fmt, str::FromStr};

use sha2::{Digest, Sha256, Sha512};

use crate::error::{HashError, HashResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => {
                Err(HashError::UnsupportedAlgorithm {
                    algorithm: s.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// An expected digest in `<algorithm>:<hex>` form, as published by add-on registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

impl Checksum {
    /// Parses a `<algorithm>:<hex>` string.
    ///
    /// # Errors
    ///
    /// * [`HashError::Malformed`] if the separator or the digest is missing.
    /// * [`HashError::UnsupportedAlgorithm`] if the algorithm is neither sha256 nor sha512.
    ///
    /// # Example
    ///
    /// ```
    /// use extsync_utils::hash::{Checksum, HashAlgorithm};
    ///
    /// let checksum = Checksum::parse("sha256:ABCD").unwrap();
    /// assert_eq!(checksum.algorithm, HashAlgorithm::Sha256);
    /// assert_eq!(checksum.digest, "abcd");
    /// ```
    pub fn parse(input: &str) -> HashResult<Self> {
        let (algorithm, digest) = input.split_once(':').ok_or_else(|| {
            HashError::Malformed {
                input: input.to_string(),
            }
        })?;

        if digest.is_empty() {
            return Err(HashError::Malformed {
                input: input.to_string(),
            });
        }

        Ok(Self {
            algorithm: algorithm.parse()?,
            digest: digest.to_ascii_lowercase(),
        })
    }

    pub fn matches(&self, actual: &str) -> bool {
        self.digest.eq_ignore_ascii_case(actual)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

/// Incremental hasher used while streaming a download to disk.
pub enum StreamHasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl StreamHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => StreamHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => StreamHasher::Sha512(Sha512::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamHasher::Sha256(hasher) => hasher.update(data),
            StreamHasher::Sha512(hasher) => hasher.update(data),
        }
    }

    /// Consumes the hasher and returns the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            StreamHasher::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            StreamHasher::Sha512(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const HELLO_SHA512: &str = "9b71d224bd62f3785d96d46ad3ea3d73319bfbc2890caadae2dff72519673ca72323c3d99ba5c11d7c7acc6e14b8c5da0c4663475c2e5c3adef46f73bcdec043";

    #[test]
    fn test_parse_checksum() {
        let checksum = Checksum::parse(&format!("sha512:{HELLO_SHA512}")).unwrap();
        assert_eq!(checksum.algorithm, HashAlgorithm::Sha512);
        assert_eq!(checksum.to_string(), format!("sha512:{HELLO_SHA512}"));

        assert!(matches!(
            Checksum::parse("md5:abcd"),
            Err(HashError::UnsupportedAlgorithm { .. })
        ));
        assert!(matches!(
            Checksum::parse("abcd"),
            Err(HashError::Malformed { .. })
        ));
        assert!(matches!(
            Checksum::parse("sha256:"),
            Err(HashError::Malformed { .. })
        ));
    }

    #[test]
    fn test_stream_hasher() {
        let mut hasher = StreamHasher::new(HashAlgorithm::Sha256);
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(hasher.finalize_hex(), HELLO_SHA256);
    }
}
