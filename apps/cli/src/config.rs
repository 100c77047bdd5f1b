//! YAML configuration for the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tycoon_ai::ModelSettings;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "TYCOON_CONFIG";

/// Storage URL selecting the process-local store.
pub const MEMORY_STORAGE: &str = "memory";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    /// SQLite URL for saved settings, or `memory`.
    pub storage_url: Option<String>,
    /// Fixed RNG seed for reproducible local output.
    pub seed: Option<u64>,
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid config yaml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Config from the explicit path, else `TYCOON_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        match explicit
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()))
        {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_model_defaults() {
        let cfg = AppConfig::from_yaml(
            "model:\n  model: local-llama\n  timeout_ms: 5000\nseed: 42\n",
        )
        .unwrap();
        assert_eq!(cfg.model.model, "local-llama");
        assert_eq!(cfg.model.timeout_ms, 5000);
        assert_eq!(cfg.model.api_key_env, ModelSettings::default().api_key_env);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.storage_url, None);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(AppConfig::from_yaml("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(AppConfig::from_yaml("seed: not-a-number").is_err());
    }
}
