//! Content hashing for export manifests.

use sha2::{Digest, Sha256};

/// SHA256 of a member's bytes as lowercase hex.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
