//! Dot-path access into a tree.
//!
//! Keys are separated by `.`; a component may carry one sequence index, as
//! in `ingress.hosts[0].name`.

use crate::types::{Mapping, TreeValue};

/// Separator between path components.
pub const SPLIT_TOKEN: char = '.';

/// Largest index [`TreeValue::set`] pads a sequence up to.
pub const MAX_SET_INDEX: usize = 65_535;

/// Error type for path access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// An index bracket is unbalanced, negative or not a number.
    #[error("malformed index key: {0}")]
    MalformedIndex(String),
    /// The path cannot be used for this operation (e.g. empty).
    #[error("invalid index key usage: {0}")]
    InvalidIndexUsage(String),
    /// A component does not exist.
    #[error("unable to find the key: {0}")]
    KeyNotFound(String),
    /// An index is past the end of a sequence.
    #[error("index out of bounds: {index} (len {len})")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Sequence length.
        len: usize,
    },
    /// A `set` index is above [`MAX_SET_INDEX`].
    #[error("index too large to set: {index} (max {max})")]
    IndexTooLarge {
        /// Requested index.
        index: usize,
        /// Largest accepted index.
        max: usize,
    },
    /// A component traverses a value of the wrong shape.
    #[error("invalid type: cannot {op} {kind}")]
    InvalidType {
        /// Attempted operation.
        op: &'static str,
        /// Shape of the value found.
        kind: String,
    },
}

/// One parsed path component.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Component<'a> {
    key: &'a str,
    index: Option<usize>,
}

fn parse_component(raw: &str) -> Result<Component<'_>, PathError> {
    match (raw.find('['), raw.find(']')) {
        (None, None) => Ok(Component { key: raw, index: None }),
        (Some(open), Some(close)) if open < close && close == raw.len() - 1 => {
            let index = raw[open + 1..close]
                .parse::<usize>()
                .map_err(|_| PathError::MalformedIndex(raw.to_string()))?;
            Ok(Component { key: &raw[..open], index: Some(index) })
        }
        _ => Err(PathError::MalformedIndex(raw.to_string())),
    }
}

fn parse_path(path: &str) -> Result<Vec<Component<'_>>, PathError> {
    path.split(SPLIT_TOKEN).map(parse_component).collect()
}

impl TreeValue {
    /// Look up the value at `path`. An empty path returns the tree itself.
    pub fn lookup(&self, path: &str) -> Result<&TreeValue, PathError> {
        if path.is_empty() {
            return Ok(self);
        }
        let mut current = self;
        for component in parse_path(path)? {
            current = match current {
                TreeValue::Mapping(m) => m
                    .get(component.key)
                    .ok_or_else(|| PathError::KeyNotFound(component.key.to_string()))?,
                other => {
                    return Err(PathError::InvalidType {
                        op: "look up a key in",
                        kind: other.kind().to_string(),
                    })
                }
            };
            if let Some(index) = component.index {
                current = match current {
                    TreeValue::Sequence(items) => items.get(index).ok_or(
                        PathError::IndexOutOfBounds { index, len: items.len() },
                    )?,
                    other => {
                        return Err(PathError::InvalidType {
                            op: "index into",
                            kind: other.kind().to_string(),
                        })
                    }
                };
            }
        }
        Ok(current)
    }

    /// Return the first path in `paths` that resolves, with its value.
    pub fn lookup_first<'p>(&self, paths: &[&'p str]) -> Result<(&TreeValue, &'p str), PathError> {
        paths
            .iter()
            .find_map(|p| self.lookup(p).ok().map(|v| (v, *p)))
            .ok_or_else(|| PathError::KeyNotFound(paths.join(", ")))
    }

    /// Set the value at `path`, creating intermediate mappings and
    /// sequences. Sequences are padded with `null`; a node of the wrong
    /// shape on the way is replaced. Indices above [`MAX_SET_INDEX`] are
    /// rejected before anything changes.
    pub fn set(&mut self, path: &str, value: TreeValue) -> Result<(), PathError> {
        if path.is_empty() {
            return Err(PathError::InvalidIndexUsage("empty key".to_string()));
        }
        let components = parse_path(path)?;
        if let Some(index) = components
            .iter()
            .filter_map(|c| c.index)
            .find(|&i| i > MAX_SET_INDEX)
        {
            return Err(PathError::IndexTooLarge { index, max: MAX_SET_INDEX });
        }
        set_components(self, &components, value);
        Ok(())
    }

    /// Nest this tree under `base`: rebasing `{foo: 1}` on `new.base` gives
    /// `{new: {base: {foo: 1}}}`.
    pub fn rebase(self, base: &str) -> TreeValue {
        base.rsplit(SPLIT_TOKEN)
            .fold(self, |acc, key| TreeValue::mapping([(key, acc)]))
    }
}

fn set_components(node: &mut TreeValue, components: &[Component<'_>], value: TreeValue) {
    let Some((head, rest)) = components.split_first() else {
        *node = value;
        return;
    };

    if !matches!(node, TreeValue::Mapping(_)) {
        *node = TreeValue::Mapping(Mapping::new());
    }
    let TreeValue::Mapping(map) = node else {
        return;
    };
    let mut child = map.entry(head.key.to_string()).or_insert(TreeValue::Null);

    if let Some(index) = head.index {
        if !matches!(child, TreeValue::Sequence(_)) {
            *child = TreeValue::Sequence(Vec::new());
        }
        let TreeValue::Sequence(items) = child else {
            return;
        };
        if items.len() <= index {
            items.resize(index + 1, TreeValue::Null);
        }
        child = &mut items[index];
    }

    set_components(child, rest, value);
}
