//! Configuration fingerprints.
//!
//! A fingerprint is a lowercase hex SHA-256 over a canonical encoding of the
//! configuration: keys in sorted order, each key and value terminated by a NUL
//! byte, followed by any extra inputs terminated by `0x01`. Equal inputs give
//! equal fingerprints regardless of insertion order.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Fingerprint a configuration map.
pub fn compute(config: &BTreeMap<String, String>) -> String {
    compute_with(config, &[])
}

/// Fingerprint a configuration map plus extra restart-relevant inputs
/// (node roles, image version, ...).
pub fn compute_with(config: &BTreeMap<String, String>, extra: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in config {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }
    for item in extra {
        hasher.update(item.as_bytes());
        hasher.update([1u8]);
    }
    hex::encode(hasher.finalize())
}
