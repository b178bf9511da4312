//! SHA-256 content verification.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use thinlxc_common::error::{Result, ThinLxcError};

/// Computes the hex-encoded SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let mut file = std::fs::File::open(path).map_err(|e| ThinLxcError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| ThinLxcError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Extracts the digest from a checksum document.
///
/// Accepts a bare digest or `sha256sum` output (`<digest>  <file>`).
///
/// # Errors
///
/// Returns `ThinLxcError::Config` if the first token is not 64 hex characters.
pub fn parse_digest(document: &str) -> Result<String> {
    let token = document.split_whitespace().next().unwrap_or_default();
    if token.len() != 64 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ThinLxcError::Config {
            message: format!("invalid SHA-256 digest {token:?}"),
        });
    }
    Ok(token.to_ascii_lowercase())
}

/// Validates that a file matches the expected SHA-256 digest.
///
/// # Errors
///
/// Returns `ThinLxcError::HashMismatch` if the digests differ.
pub fn validate_hash(path: &Path, expected: &str) -> Result<()> {
    let actual = hash_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ThinLxcError::HashMismatch {
            resource: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    tracing::debug!(path = %path.display(), "SHA-256 hash verified");
    Ok(())
}
