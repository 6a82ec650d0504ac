//! Pairwise extraction.

use crate::types::value::{mapping_or_none, prune};
use crate::types::{normalize_document_root, ExtractOptions, Mapping, TreeValue};

use super::{scalars_equal, sequences_equal};

/// Result of splitting two documents.
#[derive(Debug, Clone, PartialEq)]
pub struct PairExtraction {
    /// Structure shared by both documents.
    pub common: TreeValue,
    /// First document without the common part.
    pub remainder_a: TreeValue,
    /// Second document without the common part.
    pub remainder_b: TreeValue,
}

impl PairExtraction {
    /// True when nothing is shared.
    pub fn is_common_empty(&self) -> bool {
        self.common.is_empty()
    }
}

/// Split `a` and `b` into their common structure and two remainders.
///
/// Roots are normalized: an empty result is `{}`, never `null`.
pub fn extract_common(a: &TreeValue, b: &TreeValue, options: &ExtractOptions) -> PairExtraction {
    let (common, ra, rb) = extract_value(a, b, options);
    PairExtraction {
        common: normalize_document_root(common),
        remainder_a: normalize_document_root(ra),
        remainder_b: normalize_document_root(rb),
    }
}

type Split = (Option<TreeValue>, Option<TreeValue>, Option<TreeValue>);

fn extract_value(a: &TreeValue, b: &TreeValue, options: &ExtractOptions) -> Split {
    match (a, b) {
        (TreeValue::Null, TreeValue::Null) => (Some(TreeValue::Null), None, None),
        (TreeValue::Scalar(x), TreeValue::Scalar(y)) => {
            if scalars_equal(x, y) {
                (Some(a.clone()), None, None)
            } else {
                different(a, b)
            }
        }
        (TreeValue::Mapping(am), TreeValue::Mapping(bm)) => extract_mappings(am, bm, options),
        (TreeValue::Sequence(x), TreeValue::Sequence(y)) => {
            if options.include_equal_lists_in_common && sequences_equal(x, y) {
                (Some(a.clone()), None, None)
            } else {
                different(a, b)
            }
        }
        _ => different(a, b),
    }
}

fn different(a: &TreeValue, b: &TreeValue) -> Split {
    (None, Some(a.clone()), Some(b.clone()))
}

fn extract_mappings(am: &Mapping, bm: &Mapping, options: &ExtractOptions) -> Split {
    let mut common = Mapping::new();
    let mut ra = Mapping::new();
    let mut rb = Mapping::new();

    for (key, av) in am {
        match bm.get(key) {
            Some(bv) => {
                let (c, x, y) = extract_value(av, bv, options);
                if let Some(c) = prune(c) {
                    common.insert(key.clone(), c);
                }
                if let Some(x) = prune(x) {
                    ra.insert(key.clone(), x);
                }
                if let Some(y) = prune(y) {
                    rb.insert(key.clone(), y);
                }
            }
            None => {
                ra.insert(key.clone(), av.clone());
            }
        }
    }
    for (key, bv) in bm {
        if !am.contains_key(key) {
            rb.insert(key.clone(), bv.clone());
        }
    }

    (mapping_or_none(common), mapping_or_none(ra), mapping_or_none(rb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;

    fn map<const N: usize>(entries: [(&str, TreeValue); N]) -> TreeValue {
        TreeValue::mapping(entries)
    }

    fn list(items: &[i64]) -> TreeValue {
        TreeValue::sequence(items.iter().map(|i| TreeValue::from(*i)))
    }

    fn assert_invertible(a: &TreeValue, b: &TreeValue, result: &PairExtraction) {
        assert_eq!(&merge(&result.remainder_a, &result.common), a);
        assert_eq!(&merge(&result.remainder_b, &result.common), b);
    }

    #[test]
    fn test_nested_common_extraction() {
        let a = map([("a", map([("b", map([("something", list(&[1, 2, 3])), ("other", true.into())]))]))]);
        let b = map([("a", map([("b", map([("else", list(&[1, 2, 3])), ("other", true.into())]))]))]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert_eq!(result.common, map([("a", map([("b", map([("other", true.into())]))]))]));
        assert_eq!(result.remainder_a, map([("a", map([("b", map([("something", list(&[1, 2, 3]))]))]))]));
        assert_eq!(result.remainder_b, map([("a", map([("b", map([("else", list(&[1, 2, 3]))]))]))]));
        assert_invertible(&a, &b, &result);
    }

    #[test]
    fn test_disjoint_keys_have_no_common() {
        let a = map([("a", 1.into())]);
        let b = map([("b", 2.into())]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert!(result.is_common_empty());
        assert_eq!(result.remainder_a, a);
        assert_eq!(result.remainder_b, b);
    }

    #[test]
    fn test_one_sided_key_never_promoted() {
        let a = map([("only_a", map([("x", 1.into())])), ("shared", 1.into())]);
        let b = map([("shared", 1.into())]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert_eq!(result.common, map([("shared", 1.into())]));
        assert_eq!(result.remainder_a, map([("only_a", map([("x", 1.into())]))]));
        assert_eq!(result.remainder_b, TreeValue::empty_mapping());
    }

    #[test]
    fn test_equal_lists_follow_option() {
        let a = map([("l", list(&[1, 2]))]);
        let b = map([("l", list(&[1, 2]))]);

        let included = extract_common(&a, &b, &ExtractOptions::default());
        assert_eq!(included.common, a);
        assert_eq!(included.remainder_a, TreeValue::empty_mapping());

        let opts = ExtractOptions::default().with_include_equal_lists_in_common(false);
        let excluded = extract_common(&a, &b, &opts);
        assert!(excluded.is_common_empty());
        assert_eq!(excluded.remainder_a, a);
        assert_eq!(excluded.remainder_b, b);
    }

    #[test]
    fn test_unequal_lists_are_atomic() {
        let a = map([("l", list(&[1, 2, 3]))]);
        let b = map([("l", list(&[1, 2, 4]))]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert!(result.is_common_empty());
        assert_eq!(result.remainder_a, a);
        assert_eq!(result.remainder_b, b);
    }

    #[test]
    fn test_shape_mismatch_goes_whole_to_remainders() {
        let a = map([("k", map([("x", 1.into())])), ("s", 1.into())]);
        let b = map([("k", list(&[1])), ("s", 1.into())]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert_eq!(result.common, map([("s", 1.into())]));
        assert_eq!(result.remainder_a, map([("k", map([("x", 1.into())]))]));
        assert_eq!(result.remainder_b, map([("k", list(&[1]))]));
        assert_invertible(&a, &b, &result);
    }

    #[test]
    fn test_nulls() {
        let a = map([("both", TreeValue::Null), ("one", TreeValue::Null), ("keep", 1.into())]);
        let b = map([("both", TreeValue::Null), ("one", 5.into()), ("keep", 1.into())]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert_eq!(result.common, map([("both", TreeValue::Null), ("keep", 1.into())]));
        assert_eq!(result.remainder_a, map([("one", TreeValue::Null)]));
        assert_eq!(result.remainder_b, map([("one", 5.into())]));
        assert_invertible(&a, &b, &result);
    }

    #[test]
    fn test_int_and_float_are_different() {
        let a = map([("n", 1.into())]);
        let b = map([("n", 1.0.into())]);

        let result = extract_common(&a, &b, &ExtractOptions::default());

        assert!(result.is_common_empty());
    }

    #[test]
    fn test_null_roots_normalize_to_empty_mapping() {
        let result = extract_common(&TreeValue::Null, &TreeValue::Null, &ExtractOptions::default());
        assert_eq!(result.common, TreeValue::empty_mapping());
        assert_eq!(result.remainder_a, TreeValue::empty_mapping());
        assert_eq!(result.remainder_b, TreeValue::empty_mapping());
    }

    #[test]
    fn test_scalar_and_sequence_roots_are_invertible() {
        let opts = ExtractOptions::default();
        let cases = [
            (TreeValue::from(1), TreeValue::from(2)),
            (TreeValue::from(1), TreeValue::from(1)),
            (list(&[1]), list(&[2])),
            (list(&[1]), list(&[1])),
            (TreeValue::from("x"), list(&[1])),
            (map([("a", 1.into())]), TreeValue::from(true)),
        ];

        for (a, b) in &cases {
            let result = extract_common(a, b, &opts);
            assert_invertible(a, b, &result);
        }

        let result = extract_common(&TreeValue::from(1), &TreeValue::from(2), &opts);
        assert!(result.is_common_empty());
        assert_eq!(result.remainder_a, TreeValue::from(1));

        let excluded = opts.with_include_equal_lists_in_common(false);
        let result = extract_common(&list(&[1]), &list(&[1]), &excluded);
        assert_eq!(result.common, TreeValue::empty_mapping());
        assert_invertible(&list(&[1]), &list(&[1]), &result);
    }

    #[test]
    fn test_identical_documents_are_fully_common() {
        let a = map([("svc", map([("port", 80.into()), ("tags", list(&[1]))]))]);

        let result = extract_common(&a, &a, &ExtractOptions::default());

        assert_eq!(result.common, a);
        assert_eq!(result.remainder_a, TreeValue::empty_mapping());
        assert_eq!(result.remainder_b, TreeValue::empty_mapping());
    }
}
