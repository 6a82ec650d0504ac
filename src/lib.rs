//! # values-extract
//!
//! Factor Helm `values.yaml` hierarchies into shared and specific parts.
//!
//! Given sibling documents, the extractor computes the structure they all
//! share (the **common** tree) and what is left of each document once that
//! structure is removed (its **remainder**). Writing the common tree to the
//! parent directory and each remainder back to its child keeps the Helm chain
//! `parent, child` evaluating to the original values.
//!
//! ## Core Contract
//!
//! 1. `merge(remainder, common)` rebuilds each input document exactly
//! 2. Unequal sequences are never split; they land whole in their remainders
//! 3. Extraction over a directory tree runs bottom-up to a fixed point
//!
//! ## Architecture
//!
//! ```text
//! bytes → Codec → TreeValue → extract / merge → TreeValue → Codec → bytes
//!                                   ↑
//!              ValuesFiles (sibling groups, propagation)
//!                                   ↓
//!                 Filesystem (OS or in-memory)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Mapping keys are kept sorted, so serialized output is stable
//! - Parent directories are visited deepest first, ties broken by path
//! - Reported paths are sorted and deduplicated

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod codec;
pub mod canonical;
pub mod extract;
pub mod merge;
pub mod document;
pub mod path;
pub mod commented;
pub mod fs;
pub mod files;
pub mod propagate;

// Re-exports
pub use types::{
    TreeValue, Scalar, Mapping, ValueKind, ExtractOptions, normalize_document_root,
    INCLUDE_EQUAL_LISTS_ENV,
};
pub use codec::{Codec, CodecError, YamlCodec, JsonCodec};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use extract::{
    extract_common, extract_common_n, compute_common, subtract_common,
    PairExtraction, Extraction, ExtractError,
};
pub use merge::{merge, merge_all};
pub use document::{
    extract_common_yaml, extract_common_n_yaml, merge_yaml, equal_yaml,
    PairDocuments, Documents, DocumentError,
};
pub use path::{PathError, MAX_SET_INDEX, SPLIT_TOKEN};
pub use commented::commented_out;
pub use fs::{Filesystem, EntryKind, WalkEntry, OsFilesystem, InMemoryFilesystem, DEFAULT_FILE_MODE};
pub use files::{
    ValuesFiles, FilesError, extract_common_files, extract_common_files_n, VALUES_FILE_NAME,
};
pub use propagate::{extract_common_recursive, PropagationReport, GroupRecord};

