//! Byte-level document operations.
//!
//! Thin wrappers that parse YAML documents, run the tree algorithms and
//! serialize the results back to YAML.

use crate::codec::{Codec, CodecError, YamlCodec};
use crate::extract::{extract_common, extract_common_n, ExtractError};
use crate::merge::merge;
use crate::types::ExtractOptions;

/// Error type for byte-level operations.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A document could not be parsed or emitted.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The extraction itself was rejected.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Serialized output of a pairwise extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairDocuments {
    /// Common YAML.
    pub common: Vec<u8>,
    /// First document without the common part.
    pub remainder_a: Vec<u8>,
    /// Second document without the common part.
    pub remainder_b: Vec<u8>,
}

/// Serialized output of an N-ary extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documents {
    /// Common YAML.
    pub common: Vec<u8>,
    /// Remainders in input order.
    pub remainders: Vec<Vec<u8>>,
}

/// Extract the common structure of two YAML documents.
pub fn extract_common_yaml(
    a: &[u8],
    b: &[u8],
    options: &ExtractOptions,
) -> Result<PairDocuments, DocumentError> {
    let codec = YamlCodec;
    let result = extract_common(&codec.parse(a)?, &codec.parse(b)?, options);
    Ok(PairDocuments {
        common: codec.serialize(&result.common)?,
        remainder_a: codec.serialize(&result.remainder_a)?,
        remainder_b: codec.serialize(&result.remainder_b)?,
    })
}

/// Extract the common structure of N YAML documents.
pub fn extract_common_n_yaml<D: AsRef<[u8]>>(
    docs: &[D],
    options: &ExtractOptions,
) -> Result<Documents, DocumentError> {
    let codec = YamlCodec;
    let trees = docs
        .iter()
        .map(|d| codec.parse(d.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let result = extract_common_n(&trees, options)?;

    Ok(Documents {
        common: codec.serialize(&result.common)?,
        remainders: result
            .remainders
            .iter()
            .map(|r| codec.serialize(r))
            .collect::<Result<_, _>>()?,
    })
}

/// Merge an overlay YAML document onto a base YAML document.
pub fn merge_yaml(base: &[u8], overlay: &[u8]) -> Result<Vec<u8>, DocumentError> {
    let codec = YamlCodec;
    let merged = merge(&codec.parse(base)?, &codec.parse(overlay)?);
    Ok(codec.serialize(&merged)?)
}

/// Compare two YAML documents by content, ignoring formatting, comments
/// and key order.
pub fn equal_yaml(a: &[u8], b: &[u8]) -> Result<bool, DocumentError> {
    let codec = YamlCodec;
    Ok(codec.parse(a)? == codec.parse(b)?)
}
