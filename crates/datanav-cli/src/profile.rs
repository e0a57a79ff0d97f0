//! Saved connection profile.
//!
//! Discovery answers are persisted next to the model so repeat runs skip the
//! interview entirely. The file holds credentials the operator typed in, so
//! it stays under `output/` with the rest of the working set.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use datanav_discovery::{MongoConfig, PostgresConfig};
use datanav_llm::LlmConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedConfig {
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
    #[serde(default)]
    pub mongo: Option<MongoConfig>,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

pub fn save_config(config: &SavedConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(config).context("failed to serialize profile")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write profile to {}", path.display()))
}

pub fn load_saved_config(path: &Path) -> Result<SavedConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read profile {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("profile {} is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = SavedConfig {
            postgres: Some(PostgresConfig {
                password: "secret".to_string(),
                ..PostgresConfig::default()
            }),
            mongo: Some(MongoConfig::default()),
            llm: Some(LlmConfig {
                api_key: Some("tok".to_string()),
                ..LlmConfig::new("prompt")
            }),
        };

        save_config(&config, &path).unwrap();
        let loaded = load_saved_config(&path).unwrap();

        assert_eq!(loaded.postgres.as_ref().unwrap().password, "secret");
        assert_eq!(loaded.mongo.as_ref().unwrap().uri, "mongodb://localhost:27017");
        assert_eq!(loaded.llm.as_ref().unwrap().api_key.as_deref(), Some("tok"));
        assert_eq!(loaded.llm.as_ref().unwrap().batch_size, 0);
    }

    #[test]
    fn missing_sections_default_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let loaded = load_saved_config(&path).unwrap();
        assert!(loaded.postgres.is_none());
        assert!(loaded.mongo.is_none());
        assert!(loaded.llm.is_none());
    }
}
