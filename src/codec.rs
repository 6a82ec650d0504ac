//! Text codecs between documents and [`TreeValue`].
//!
//! The extraction algorithms never see text; they are fed trees produced by
//! a [`Codec`]. YAML is the native format of `values.yaml` files; JSON is
//! supported through the same tree model.

use crate::types::{Mapping, Scalar, TreeValue};

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// YAML could not be parsed or emitted.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON could not be parsed or emitted.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Two keys of one mapping render to the same string key (`1` and `"1"`).
    #[error("duplicate mapping key after stringification: {0}")]
    DuplicateKey(String),
}

/// Converts between document bytes and trees.
pub trait Codec {
    /// Parse a document. Empty input parses as [`TreeValue::Null`].
    fn parse(&self, bytes: &[u8]) -> Result<TreeValue, CodecError>;

    /// Serialize a tree. Mapping keys are emitted in lexicographic order.
    fn serialize(&self, value: &TreeValue) -> Result<Vec<u8>, CodecError>;
}

/// YAML codec backed by `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn parse(&self, bytes: &[u8]) -> Result<TreeValue, CodecError> {
        if is_blank_yaml(bytes) {
            return Ok(TreeValue::Null);
        }
        let raw: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
        from_yaml(raw)
    }

    fn serialize(&self, value: &TreeValue) -> Result<Vec<u8>, CodecError> {
        Ok(serde_yaml::to_string(value)?.into_bytes())
    }
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn parse(&self, bytes: &[u8]) -> Result<TreeValue, CodecError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(TreeValue::Null);
        }
        let raw: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(from_json(raw))
    }

    fn serialize(&self, value: &TreeValue) -> Result<Vec<u8>, CodecError> {
        let mut out = serde_json::to_vec_pretty(value)?;
        out.push(b'\n');
        Ok(out)
    }
}

// Whitespace and comment-only documents carry no value.
fn is_blank_yaml(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes).lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn from_yaml(value: serde_yaml::Value) -> Result<TreeValue, CodecError> {
    use serde_yaml::Value;

    Ok(match value {
        Value::Null => TreeValue::Null,
        Value::Bool(b) => TreeValue::Scalar(Scalar::Bool(b)),
        Value::Number(n) => number(n.as_i64(), n.as_u64(), n.as_f64()),
        Value::String(s) => TreeValue::Scalar(Scalar::String(s)),
        Value::Sequence(items) => TreeValue::Sequence(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(entries) => {
            let mut out = Mapping::new();
            for (k, v) in entries {
                let key = yaml_key_to_string(k);
                if out.contains_key(&key) {
                    tracing::warn!(key = %key, "Mapping keys collide after stringification");
                    return Err(CodecError::DuplicateKey(key));
                }
                out.insert(key, from_yaml(v)?);
            }
            TreeValue::Mapping(out)
        }
        Value::Tagged(tagged) => from_yaml(tagged.value)?,
    })
}

// Integers keep their exact value; only non-integers become floats.
fn number(i: Option<i64>, u: Option<u64>, f: Option<f64>) -> TreeValue {
    match (i, u) {
        (Some(i), _) => TreeValue::Scalar(Scalar::Int(i)),
        (None, Some(u)) => TreeValue::Scalar(Scalar::UInt(u)),
        (None, None) => TreeValue::Scalar(Scalar::Float(f.unwrap_or(f64::NAN))),
    }
}

/// Mapping keys must be strings; other key types are rendered as YAML text.
fn yaml_key_to_string(key: serde_yaml::Value) -> String {
    use serde_yaml::Value;

    match key {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().replace(['\n', '\r', '\t'], " "))
            .unwrap_or_default(),
    }
}

fn from_json(value: serde_json::Value) -> TreeValue {
    use serde_json::Value;

    match value {
        Value::Null => TreeValue::Null,
        Value::Bool(b) => TreeValue::Scalar(Scalar::Bool(b)),
        Value::Number(n) => number(n.as_i64(), n.as_u64(), n.as_f64()),
        Value::String(s) => TreeValue::Scalar(Scalar::String(s)),
        Value::Array(items) => TreeValue::Sequence(items.into_iter().map(from_json).collect()),
        Value::Object(entries) => {
            TreeValue::Mapping(entries.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}
