//! Canonical serialization for deterministic fingerprints.
//!
//! Documents are fingerprinted so logs and propagation reports can identify a
//! common tree without printing it.
//!
//! ## Determinism Guarantees
//!
//! - Mapping keys serialize in lexicographic order (`BTreeMap`)
//! - Sequences serialize in index order
//! - Scalars keep their exact type (`1` and `1.0` hash differently)
//!
//! Serialization errors are returned rather than hashed around: a value whose
//! `Serialize` impl rejects JSON (non-string map keys, custom errors) has no
//! canonical form.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, serde_json::Error> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}
