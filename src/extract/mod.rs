//! Common-structure extraction.
//!
//! Two flavours share the same tree rules:
//!
//! - [`pairwise`]: symmetric split of two trees into `(common, ra, rb)`.
//! - [`nary`]: one common tree computed by key intersection across N trees,
//!   then each remainder derived by subtracting that common tree.
//!
//! ## Invertibility
//!
//! For every input document `d` with remainder `r` and common `c`,
//! `merge(r, c) == d`. Common and remainder never hold conflicting values at
//! the same path, so the check does not depend on merge conflict rules.
//! Empty mappings and sequences are pruned, so the equality holds modulo
//! empty containers.
//!
//! ## Node rules
//!
//! | Shapes | Outcome |
//! |--------|---------|
//! | scalar / scalar | common when equal, else each side keeps its own |
//! | null / null | common (`key: null` survives in the common tree) |
//! | mapping / mapping | recurse on shared keys, one-sided keys stay in their remainder |
//! | sequence / sequence | common only when equal and the option allows it |
//! | anything else | nothing common, each side keeps its own value whole |

pub mod pairwise;
pub mod nary;

pub use pairwise::{extract_common, PairExtraction};
pub use nary::{compute_common, extract_common_n, subtract_common, Extraction};

use crate::types::{Scalar, TreeValue};

/// Error type for extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// N-ary extraction needs at least two documents.
    #[error("need at least 2 documents, got {got}")]
    TooFewDocuments {
        /// Number of documents supplied.
        got: usize,
    },
}

/// Exact equality for scalars. Floats compare by value, so `NaN` never
/// matches and always stays in the remainders.
pub(crate) fn scalars_equal(a: &Scalar, b: &Scalar) -> bool {
    a == b
}

/// Sequences are atomic: equal only when identical element by element.
pub(crate) fn sequences_equal(a: &[TreeValue], b: &[TreeValue]) -> bool {
    a == b
}
