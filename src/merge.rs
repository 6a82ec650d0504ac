//! Reconciling merge.
//!
//! Deep-overlays one tree on another with Helm's "last values file wins"
//! semantics. It is the inverse of extraction (`merge(remainder, common)`
//! rebuilds the original document) and a general value composition
//! primitive.
//!
//! ## Rules
//!
//! - Root: a `null` document on either side yields the other side, and an
//!   empty-mapping overlay leaves the base untouched (an empty values file
//!   changes nothing).
//! - Mapping vs mapping: union of keys, shared keys merged recursively.
//! - Any other pair (scalars, sequences, shape conflicts): the overlay wins
//!   whole. Sequences are replaced, never concatenated.
//! - Inside a mapping, an explicit `null` in the overlay nullifies the base
//!   value at that key.

use crate::types::{Mapping, TreeValue};

/// Merge `overlay` onto `base`.
pub fn merge(base: &TreeValue, overlay: &TreeValue) -> TreeValue {
    match (base, overlay) {
        (TreeValue::Null, _) => overlay.clone(),
        (_, TreeValue::Null) => base.clone(),
        (_, TreeValue::Mapping(om)) if om.is_empty() => base.clone(),
        _ => merge_node(base, overlay),
    }
}

/// Fold a chain of layers left to right: later layers win.
///
/// An empty chain yields `null`.
pub fn merge_all<'a, I>(layers: I) -> TreeValue
where
    I: IntoIterator<Item = &'a TreeValue>,
{
    layers
        .into_iter()
        .fold(TreeValue::Null, |acc, layer| merge(&acc, layer))
}

fn merge_node(base: &TreeValue, overlay: &TreeValue) -> TreeValue {
    match (base, overlay) {
        (TreeValue::Mapping(bm), TreeValue::Mapping(om)) => TreeValue::Mapping(merge_mappings(bm, om)),
        // Explicit null nullifies; a null base never blocks the overlay.
        (_, TreeValue::Null) => TreeValue::Null,
        _ => overlay.clone(),
    }
}

fn merge_mappings(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut out = base.clone();
    for (key, ov) in overlay {
        let merged = match out.get(key) {
            Some(bv) => merge_node(bv, ov),
            None => ov.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}
