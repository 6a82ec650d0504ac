//! Render a document with masked branches commented out.
//!
//! `full` holds every field with its value; `masked` is the same structure
//! with some branches omitted or set to `null`. Those branches are still
//! rendered, but as YAML comments, so the output documents available knobs
//! without setting them.

use crate::codec::CodecError;
use crate::types::{Mapping, TreeValue};

/// Render `full` as YAML, commenting out branches absent or `null` in `masked`.
pub fn commented_out(full: &TreeValue, masked: &TreeValue) -> Result<String, CodecError> {
    let mut out = String::new();
    match full {
        TreeValue::Mapping(fm) => emit_map(&mut out, 0, fm, masked.as_mapping())?,
        other => {
            let block = serde_yaml::to_string(other)?;
            write_block(&mut out, 0, &block, masked.is_null());
        }
    }
    Ok(out)
}

fn emit_map(
    out: &mut String,
    indent: usize,
    full: &Mapping,
    masked: Option<&Mapping>,
) -> Result<(), CodecError> {
    for (key, value) in full {
        let mask = masked.and_then(|m| m.get(key)).filter(|m| !m.is_null());
        let Some(mask) = mask else {
            emit_key(out, indent, key, value, true)?;
            continue;
        };

        match value {
            TreeValue::Mapping(nested) if !nested.is_empty() => {
                write_line(out, indent, false, &format!("{key}:"));
                emit_map(out, indent + 2, nested, mask.as_mapping())?;
            }
            _ => emit_key(out, indent, key, value, false)?,
        }
    }
    Ok(())
}

fn emit_key(
    out: &mut String,
    indent: usize,
    key: &str,
    value: &TreeValue,
    comment: bool,
) -> Result<(), CodecError> {
    // Single-line form avoids the emitter quoting short keys like `y` or `on`.
    if comment && matches!(value, TreeValue::Null | TreeValue::Scalar(_)) {
        let rendered = serde_yaml::to_string(value)?;
        let key = if needs_quoting(key) {
            format!("\"{key}\"")
        } else {
            key.to_string()
        };
        write_line(out, indent, true, &format!("{key}: {}", rendered.trim()));
        return Ok(());
    }

    let block = serde_yaml::to_string(&TreeValue::mapping([(key, value.clone())]))?;
    write_block(out, indent, &block, comment);
    Ok(())
}

fn write_line(out: &mut String, indent: usize, comment: bool, line: &str) {
    out.extend(std::iter::repeat(' ').take(indent));
    if comment {
        out.push_str("# ");
    }
    out.push_str(line);
    out.push('\n');
}

fn write_block(out: &mut String, indent: usize, block: &str, comment: bool) {
    for line in block.trim_end_matches('\n').lines() {
        write_line(out, indent, comment, line);
    }
}

fn needs_quoting(key: &str) -> bool {
    let k = key.trim();
    if k.is_empty() {
        return true;
    }
    if matches!(
        k.to_lowercase().as_str(),
        "y" | "yes" | "n" | "no" | "true" | "false" | "on" | "off" | "null" | "~"
    ) {
        return true;
    }
    k.chars().any(|c| ":#{}[]&,*>!|%@`\"\n\r\t".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map<const N: usize>(entries: [(&str, TreeValue); N]) -> TreeValue {
        TreeValue::mapping(entries)
    }

    #[test]
    fn test_comments_masked_branches() {
        let full = map([("a", 1.into()), ("b", map([("c", 2.into()), ("d", 3.into())]))]);
        let masked = map([("b", map([("c", 2.into())]))]);

        let out = commented_out(&full, &masked).unwrap();

        assert_eq!(out, "# a: 1\nb:\n  c: 2\n  # d: 3\n");
    }

    #[test]
    fn test_null_in_mask_comments_subtree() {
        let full = map([("svc", map([("port", 80.into())])), ("keep", true.into())]);
        let masked = map([("svc", TreeValue::Null), ("keep", true.into())]);

        let out = commented_out(&full, &masked).unwrap();

        assert_eq!(out, "keep: true\n# svc:\n#   port: 80\n");
    }

    #[test]
    fn test_lists_are_commented_whole() {
        let full = map([("l", TreeValue::sequence([1.into(), 2.into()]))]);

        let out = commented_out(&full, &TreeValue::empty_mapping()).unwrap();

        assert_eq!(out, "# l:\n# - 1\n# - 2\n");
    }

    #[test]
    fn test_boolean_like_keys_are_quoted() {
        let full = map([("on", 1.into())]);

        let out = commented_out(&full, &TreeValue::Null).unwrap();

        assert_eq!(out, "# \"on\": 1\n");
    }

    #[test]
    fn test_unmasked_document_renders_plainly() {
        let full = map([("a", map([("b", "x".into())]))]);

        let out = commented_out(&full, &full).unwrap();

        assert_eq!(out, "a:\n  b: x\n");
    }
}
