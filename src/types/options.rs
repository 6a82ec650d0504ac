//! Extraction options.

use serde::{Deserialize, Serialize};

/// Environment variable overriding
/// [`ExtractOptions::include_equal_lists_in_common`].
pub const INCLUDE_EQUAL_LISTS_ENV: &str = "VALUES_EXTRACT_INCLUDE_EQUAL_LISTS";

/// Controls how common structure is extracted.
///
/// Deserializable so it can be loaded from a config file; missing fields
/// fall back to [`ExtractOptions::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Promote sequences that are exactly equal across all documents into the
    /// common result. When false, equal sequences stay in every remainder.
    pub include_equal_lists_in_common: bool,
}

impl ExtractOptions {
    /// Set whether equal sequences are considered common.
    pub fn with_include_equal_lists_in_common(mut self, include: bool) -> Self {
        self.include_equal_lists_in_common = include;
        self
    }

    /// Load from a YAML or JSON config document. Missing fields use defaults.
    pub fn from_config(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(bytes)
    }

    /// Apply overrides from the environment.
    ///
    /// Reads `VALUES_EXTRACT_INCLUDE_EQUAL_LISTS` (`true`/`false`/`1`/`0`).
    pub fn with_env_overrides(self) -> Self {
        self.with_include_equal_lists_override(std::env::var(INCLUDE_EQUAL_LISTS_ENV).ok().as_deref())
    }

    fn with_include_equal_lists_override(self, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return self;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => self.with_include_equal_lists_in_common(true),
            "0" | "false" | "no" => self.with_include_equal_lists_in_common(false),
            other => {
                tracing::warn!(
                    var = INCLUDE_EQUAL_LISTS_ENV,
                    value = other,
                    "Ignoring unrecognized boolean"
                );
                self
            }
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_equal_lists_in_common: true,
        }
    }
}
