//! SHA-256 helpers used for cache keys and checksum verification.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Compute the SHA-256 hex digest of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hex digest of a file using streaming reads.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, UtilError> {
    let file = std::fs::File::open(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that the file at `path` hashes to `expected` (case-insensitive hex).
///
/// # Errors
/// Returns `UtilError::HashMismatch` when the digests differ, or an I/O error.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<(), UtilError> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(UtilError::HashMismatch {
            path: path.display().to_string(),
            expected: expected.to_owned(),
            actual,
        })
    }
}
