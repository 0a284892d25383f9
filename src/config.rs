//! Configuration management for the live-prefs shell
//!
//! Handles loading, validating and hot-reloading the YAML file that sets the
//! log level and the seed values written into the store at startup.

pub mod watcher;

use crate::error::PrefsError;
use crate::store::Primitive;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::fs;

pub use watcher::{ConfigUpdate, ConfigWatcher, SeedDiff};

/// Root configuration structure
///
/// ```yaml
/// log_level: debug
/// seed:
///   volume: 80
///   muted: false
///   theme: dark
///   recent: [a.txt, b.txt]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PrefsConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Values written into the store, keyed by preference key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seed: BTreeMap<String, Primitive>,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            seed: BTreeMap::new(),
        }
    }
}

impl PrefsConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate configuration text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: PrefsConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), PrefsError> {
        if self.log_level.trim().is_empty() {
            return Err(PrefsError::Config("log_level cannot be empty".to_string()));
        }
        if self.seed.keys().any(|key| key.is_empty()) {
            return Err(PrefsError::Config("seed keys cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_seed_values() {
        let config = PrefsConfig::from_yaml(
            r#"
log_level: debug
seed:
  volume: 80
  gain: 0.75
  muted: false
  theme: dark
  recent: [a.txt, b.txt]
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.seed["volume"], Primitive::Int(80));
        assert_eq!(config.seed["gain"], Primitive::Float(0.75));
        assert_eq!(config.seed["muted"], Primitive::Bool(false));
        assert_eq!(config.seed["theme"], Primitive::String("dark".to_string()));
        assert_eq!(
            config.seed["recent"],
            Primitive::StringList(vec!["a.txt".to_string(), "b.txt".to_string()])
        );
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = PrefsConfig::from_yaml("{}").unwrap();
        assert_eq!(config, PrefsConfig::default());
    }

    #[test]
    fn test_empty_seed_key_rejected() {
        let err = PrefsConfig::from_yaml("seed:\n  '': 1\n").unwrap_err();
        assert!(err.to_string().contains("seed keys cannot be empty"));
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("prefs.yaml");
        let path = path.to_string_lossy().to_string();

        let mut config = PrefsConfig::default();
        config.seed.insert("count".to_string(), Primitive::Int(3));
        config.save(&path).await?;

        let loaded = PrefsConfig::load(&path).await?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = PrefsConfig::load("/definitely/not/here.yaml").await;
        assert!(result.is_err());
    }
}
