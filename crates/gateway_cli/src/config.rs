//! Gateway configuration file handling
//!
//! The binary reads an optional `gateway.toml`:
//!
//! ```toml
//! [state]
//! max_history = 100
//!
//! [scheduler]
//! target_fps = 72
//!
//! [assets]
//! root = "public"
//! key_strategy = "exact"
//!
//! [voice]
//! sensitivity = 0.6
//!
//! [storage]
//! dir = ".gateway"
//! ```
//!
//! Every table and field is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use gateway_assets::AssetConfig;
use gateway_core::{SchedulerConfig, StoreConfig};
use gateway_voice::VoiceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "gateway.toml";

/// Where persisted state is written
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per storage key
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".gateway"),
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub state: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub assets: AssetConfig,
    pub voice: VoiceConfig,
    pub storage: StorageConfig,
}

impl GatewayConfig {
    /// Load configuration
    ///
    /// An explicitly given file must exist. Without one, `gateway.toml` in
    /// the working directory is used if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.exists() {
                    Self::load_file(path)
                } else {
                    tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_assets::KeyStrategy;

    #[test]
    fn test_empty_file_is_default() {
        let config = GatewayConfig::from_toml("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.state.storage_key, "signpost-engine-state");
        assert_eq!(config.assets.max_cache_size, 50);
    }

    #[test]
    fn test_partial_tables() {
        let config = GatewayConfig::from_toml(
            r#"
            [state]
            max_history = 10

            [assets]
            key_strategy = "sanitized"
            root = "public"

            [storage]
            dir = "/var/lib/gateway"
            "#,
        )
        .unwrap();

        assert_eq!(config.state.max_history, 10);
        assert_eq!(config.state.persisted_branches, vec!["user", "scene", "app"]);
        assert_eq!(config.scheduler.target_fps, 60);
        assert_eq!(config.assets.key_strategy, KeyStrategy::Sanitized);
        assert_eq!(config.assets.root, PathBuf::from("public"));
        assert_eq!(config.voice.sensitivity, 0.7);
        assert_eq!(config.storage.dir, PathBuf::from("/var/lib/gateway"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[scheduler]\ntarget_fps = 90\n").unwrap();

        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.scheduler.target_fps, 90);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(GatewayConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_fails() {
        assert!(GatewayConfig::from_toml("[state\nmax_history = ").is_err());
        assert!(GatewayConfig::from_toml("[voice]\nsensitivity = \"high\"").is_err());
    }
}
