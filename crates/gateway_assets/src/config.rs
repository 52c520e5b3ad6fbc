//! Asset manager configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a source path is turned into a cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// The path itself; distinct paths never share an entry
    #[default]
    Exact,
    /// Every non-alphanumeric character replaced with `_`
    ///
    /// `models/a-b.glb` and `models/a_b.glb` resolve to the same entry.
    Sanitized,
}

impl KeyStrategy {
    pub fn key_for(self, path: &str) -> String {
        match self {
            KeyStrategy::Exact => path.to_string(),
            KeyStrategy::Sanitized => path
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect(),
        }
    }
}

/// Which entry the bounded cache drops when it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Oldest inserted entry, regardless of use
    #[default]
    Fifo,
    /// Least recently read or inserted entry
    Lru,
}

/// Asset manager configuration, read from the `[assets]` table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Maximum number of completed assets kept in the cache
    pub max_cache_size: usize,
    pub key_strategy: KeyStrategy,
    pub eviction: EvictionPolicy,
    /// Directory the file loader resolves asset paths against
    pub root: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 50,
            key_strategy: KeyStrategy::Exact,
            eviction: EvictionPolicy::Fifo,
            root: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_keys_are_injective() {
        let a = KeyStrategy::Exact.key_for("models/a-b.glb");
        let b = KeyStrategy::Exact.key_for("models/a_b.glb");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitized_keys_collide() {
        let a = KeyStrategy::Sanitized.key_for("models/a-b.glb");
        let b = KeyStrategy::Sanitized.key_for("models/a_b.glb");
        assert_eq!(a, "models_a_b_glb");
        assert_eq!(a, b);
    }

    #[test]
    fn test_config_from_json() {
        let config: AssetConfig =
            serde_json::from_str(r#"{"key_strategy": "sanitized", "eviction": "lru"}"#).unwrap();
        assert_eq!(config.key_strategy, KeyStrategy::Sanitized);
        assert_eq!(config.eviction, EvictionPolicy::Lru);
        assert_eq!(config.max_cache_size, 50);
    }
}
