//! Content digests for catalog verification.
//!
//! Streams bytes into MD5 or SHA-256 in fixed-size chunks and yields the
//! lowercase hex encoding. A read error part-way through is reported, never
//! turned into a digest of the bytes seen so far.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

/// Hash function used for catalog checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha256 => "sha256",
        }
    }

    /// Length of the hex digest this algorithm produces.
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            other => Err(format!("unknown checksum algorithm: {other}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("stream read failed after {bytes_read} bytes: {source}")]
    Read {
        bytes_read: u64,
        #[source]
        source: io::Error,
    },
    #[error("open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result of hashing a stream to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDigest {
    pub hex: String,
    pub bytes_read: u64,
}

fn feed<D: Digest, R: Read>(mut hasher: D, reader: &mut R) -> Result<StreamDigest, DigestError> {
    let mut buf = vec![0u8; BUF_SIZE];
    let mut bytes_read = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(DigestError::Read { bytes_read, source }),
        };
        hasher.update(&buf[..n]);
        bytes_read += n as u64;
    }
    Ok(StreamDigest {
        hex: hex::encode(hasher.finalize()),
        bytes_read,
    })
}

/// Consume `reader` to EOF and return the lowercase hex digest plus the byte count.
pub fn digest_stream<R: Read>(
    algorithm: ChecksumAlgorithm,
    mut reader: R,
) -> Result<StreamDigest, DigestError> {
    match algorithm {
        ChecksumAlgorithm::Md5 => feed(Md5::new(), &mut reader),
        ChecksumAlgorithm::Sha256 => feed(Sha256::new(), &mut reader),
    }
}

/// Consume `reader` to EOF and return the lowercase hex digest.
pub fn digest_reader<R: Read>(algorithm: ChecksumAlgorithm, reader: R) -> Result<String, DigestError> {
    digest_stream(algorithm, reader).map(|d| d.hex)
}

/// Digest a local file. Reads in chunks so memory stays bounded for large files.
pub fn digest_path(algorithm: ChecksumAlgorithm, path: &Path) -> Result<String, DigestError> {
    let f = File::open(path).map_err(|source| DigestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    digest_reader(algorithm, f)
}

/// Compare a computed digest with a stored checksum. Exact: a stored value in
/// any other spelling (uppercase, padded) is drift and gets rewritten.
pub fn checksums_match(computed: &str, stored: &str) -> bool {
    computed == stored
}
