//! Core configuration
//!
//! Deserializable with serde so the binary can read them from the
//! `[state]` and `[scheduler]` tables of `gateway.toml`.

use serde::{Deserialize, Serialize};

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "signpost-engine-state";

/// State store configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of history entries kept for undo/redo
    pub max_history: usize,
    /// Key the persisted snapshot is written under
    pub storage_key: String,
    /// Top-level branches included in the persisted snapshot
    pub persisted_branches: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            persisted_branches: vec!["user".into(), "scene".into(), "app".into()],
        }
    }
}

/// Frame loop configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Frames per second targeted by [`TickScheduler::run`](crate::scheduler::TickScheduler::run)
    pub target_fps: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { target_fps: 60 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"max_history": 5}"#).unwrap();
        assert_eq!(config.max_history, 5);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.persisted_branches, vec!["user", "scene", "app"]);
    }
}
