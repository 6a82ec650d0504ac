//! Core types: the tree value model and extraction options.

pub mod value;
pub mod options;

pub use value::{TreeValue, Scalar, Mapping, ValueKind, normalize_document_root};
pub use options::{ExtractOptions, INCLUDE_EQUAL_LISTS_ENV};
