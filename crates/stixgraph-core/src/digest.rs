//! Content digests for externalized raw payloads.
//!
//! Raw content (e.g. `Raw_Artifact`, `Raw_Header`) above the inline threshold
//! is stored as a blob named after the SHA-256 of its bytes:
//!
//! - digest: 64 lowercase hex digits
//! - blob name: `"<digest>.blob"`

use sha2::{Digest as _, Sha256};
use std::fmt::Write as _;

/// Suffix of blob artifact names.
pub const BLOB_SUFFIX: &str = ".blob";

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Artifact name under which the blob for `digest` is stored.
pub fn blob_name(digest: &str) -> String {
    format!("{digest}{BLOB_SUFFIX}")
}
