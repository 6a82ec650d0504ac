//! N-ary extraction.
//!
//! Phase 1 computes a single common tree across all documents: a mapping key
//! survives only if it is present in every document. Phase 2 derives each
//! remainder by subtracting that common tree from the document, independently
//! of the other documents.

use crate::types::value::{mapping_or_none, prune};
use crate::types::{normalize_document_root, ExtractOptions, Mapping, TreeValue};

use super::{scalars_equal, sequences_equal, ExtractError};

/// Result of extracting the shared baseline of N documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Structure shared by every document.
    pub common: TreeValue,
    /// One remainder per input document, in input order.
    pub remainders: Vec<TreeValue>,
}

impl Extraction {
    /// True when nothing is shared.
    pub fn is_common_empty(&self) -> bool {
        self.common.is_empty()
    }
}

/// Extract the common structure of `docs` and the per-document remainders.
pub fn extract_common_n(
    docs: &[TreeValue],
    options: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    if docs.len() < 2 {
        return Err(ExtractError::TooFewDocuments { got: docs.len() });
    }

    let refs: Vec<&TreeValue> = docs.iter().collect();
    let common = normalize_document_root(compute_common(&refs, options));

    let remainders = docs
        .iter()
        .map(|doc| normalize_document_root(subtract_common(doc, &common, options)))
        .collect();

    Ok(Extraction { common, remainders })
}

/// Common value across `values`, or `None` when nothing is shared.
pub fn compute_common(values: &[&TreeValue], options: &ExtractOptions) -> Option<TreeValue> {
    let (first, rest) = values.split_first()?;

    match first {
        TreeValue::Null => rest.iter().all(|v| v.is_null()).then_some(TreeValue::Null),
        TreeValue::Scalar(base) => rest
            .iter()
            .all(|v| matches!(v, TreeValue::Scalar(s) if scalars_equal(base, s)))
            .then(|| (*first).clone()),
        TreeValue::Sequence(base) => {
            if !options.include_equal_lists_in_common {
                return None;
            }
            rest.iter()
                .all(|v| matches!(v, TreeValue::Sequence(s) if sequences_equal(base, s)))
                .then(|| (*first).clone())
        }
        TreeValue::Mapping(base) => {
            let mut maps = Vec::with_capacity(values.len());
            maps.push(base);
            for v in rest {
                maps.push(v.as_mapping()?);
            }
            common_of_mappings(&maps, options)
        }
    }
}

fn common_of_mappings(maps: &[&Mapping], options: &ExtractOptions) -> Option<TreeValue> {
    let (first, rest) = maps.split_first()?;
    let mut out = Mapping::new();

    for key in first.keys() {
        let mut key_values = Vec::with_capacity(maps.len());
        for m in maps {
            match m.get(key) {
                Some(v) => key_values.push(v),
                None => break,
            }
        }
        if key_values.len() != rest.len() + 1 {
            continue;
        }
        if let Some(c) = prune(compute_common(&key_values, options)) {
            out.insert(key.clone(), c);
        }
    }

    mapping_or_none(out)
}

/// Remove `common` from `value`, returning what only `value` carries.
///
/// Keys absent from `common` are kept whole; keys present are subtracted
/// recursively. `merge(result, common)` reconstructs `value`.
pub fn subtract_common(
    value: &TreeValue,
    common: &TreeValue,
    options: &ExtractOptions,
) -> Option<TreeValue> {
    match (value, common) {
        (TreeValue::Null, TreeValue::Null) => None,
        (TreeValue::Scalar(v), TreeValue::Scalar(c)) if scalars_equal(v, c) => None,
        (TreeValue::Sequence(v), TreeValue::Sequence(c))
            if options.include_equal_lists_in_common && sequences_equal(v, c) =>
        {
            None
        }
        (TreeValue::Mapping(vm), TreeValue::Mapping(cm)) => {
            let mut out = Mapping::new();
            for (key, v) in vm {
                match cm.get(key) {
                    Some(c) => {
                        if let Some(r) = prune(subtract_common(v, c, options)) {
                            out.insert(key.clone(), r);
                        }
                    }
                    None => {
                        out.insert(key.clone(), v.clone());
                    }
                }
            }
            mapping_or_none(out)
        }
        _ => Some(value.clone()),
    }
}
