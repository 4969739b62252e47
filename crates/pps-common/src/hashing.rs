//! Content hashing for dataset deduplication
//!
//! A dataset snapshot is identified by the SHA-256 digest of its raw byte
//! payload. The digest is used purely for equality ("have we ingested these
//! exact bytes before"), not as a security primitive.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of a byte payload.
///
/// The same bytes always produce the same digest; any single-byte change
/// produces a different one.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
