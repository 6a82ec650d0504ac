//! Generic tree value shared by every algorithm in the crate.
//!
//! A [`TreeValue`] is what a `values.yaml` document parses into: null, a
//! scalar, an ordered sequence, or a string-keyed mapping. Mappings use
//! `BTreeMap` so that serialization always emits keys in lexicographic
//! order and two equal trees always serialize to identical bytes.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::canonical::canonical_hash_hex;

/// Mapping node payload.
pub type Mapping = BTreeMap<String, TreeValue>;

/// Leaf value of a document.
///
/// Equality is exact type-and-value: `Int(1)` is not equal to `Float(1.0)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `true` / `false`.
    Bool(bool),
    /// Integer that fits in an `i64`.
    Int(i64),
    /// Positive integer above `i64::MAX`.
    UInt(u64),
    /// Any other number.
    Float(f64),
    /// String value.
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A node of a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    /// Explicit `null` (or `~`, or an empty value).
    Null,
    /// Boolean, number or string.
    Scalar(Scalar),
    /// Ordered list. Always compared and moved as a whole.
    Sequence(Vec<TreeValue>),
    /// Unordered string-keyed mapping.
    Mapping(Mapping),
}

/// Variant tag, used in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`TreeValue::Null`].
    Null,
    /// [`TreeValue::Scalar`].
    Scalar,
    /// [`TreeValue::Sequence`].
    Sequence,
    /// [`TreeValue::Mapping`].
    Mapping,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar => write!(f, "scalar"),
            Self::Sequence => write!(f, "sequence"),
            Self::Mapping => write!(f, "mapping"),
        }
    }
}

impl TreeValue {
    /// An empty mapping, the canonical "empty document".
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Build a mapping from key/value pairs.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TreeValue)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a sequence from values.
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = TreeValue>,
    {
        Self::Sequence(items.into_iter().collect())
    }

    /// Variant of this node.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Scalar(_) => ValueKind::Scalar,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Mapping(_) => ValueKind::Mapping,
        }
    }

    /// True for an empty mapping or an empty sequence.
    ///
    /// Empty containers are "nothing": they are pruned from owning mappings
    /// rather than kept as placeholders. `Null` is a value, not emptiness.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mapping(m) => m.is_empty(),
            Self::Sequence(s) => s.is_empty(),
            Self::Null | Self::Scalar(_) => false,
        }
    }

    /// True when this node is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the mapping payload, if any.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrow the mapping payload, if any.
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the sequence payload, if any.
    pub fn as_sequence(&self) -> Option<&[TreeValue]> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the scalar payload, if any.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the string payload, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Get a direct child of a mapping.
    pub fn get(&self, key: &str) -> Option<&TreeValue> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Canonical xxh64 fingerprint (hex) of this tree.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        canonical_hash_hex(self)
    }
}

/// Normalize the root of an extracted document.
///
/// Absent, `Null` and empty roots all become `{}` so that every output stays
/// a parseable structured document.
pub fn normalize_document_root(value: Option<TreeValue>) -> TreeValue {
    match value {
        Some(v) if !v.is_null() && !v.is_empty() => v,
        _ => TreeValue::empty_mapping(),
    }
}

/// Drop a computed child that carries nothing.
pub(crate) fn prune(value: Option<TreeValue>) -> Option<TreeValue> {
    value.filter(|v| !v.is_empty())
}

/// Wrap a mapping, or `None` when it ended up empty.
pub(crate) fn mapping_or_none(mapping: Mapping) -> Option<TreeValue> {
    if mapping.is_empty() {
        None
    } else {
        Some(TreeValue::Mapping(mapping))
    }
}

impl Default for TreeValue {
    fn default() -> Self {
        Self::Null
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for TreeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Scalar(s) => s.serialize(serializer),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for TreeValue {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for TreeValue {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for TreeValue {
    fn from(i: i32) -> Self {
        Self::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<u64> for TreeValue {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Self::Scalar(Scalar::Int(i)),
            Err(_) => Self::Scalar(Scalar::UInt(u)),
        }
    }
}

impl From<f64> for TreeValue {
    fn from(x: f64) -> Self {
        Self::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for TreeValue {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for TreeValue {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

impl From<Mapping> for TreeValue {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<Vec<TreeValue>> for TreeValue {
    fn from(items: Vec<TreeValue>) -> Self {
        Self::Sequence(items)
    }
}
