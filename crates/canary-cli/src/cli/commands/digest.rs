//! `canary digest` – compute the digest of a local file.

use anyhow::Result;
use canary_core::digest::{self, ChecksumAlgorithm};
use std::path::Path;

/// Compute and print the digest of the given file.
pub fn run_digest(path: &Path, algorithm: ChecksumAlgorithm) -> Result<()> {
    let hex = digest::digest_path(algorithm, path)?;
    println!("{}  {}", hex, path.display());
    Ok(())
}
