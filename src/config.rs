use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::swipe::SwipeConfig;
use crate::sync::SyncConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/hopeswap.json";
pub const USER_ID_ENV: &str = "HOPESWAP_USER_ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_path: "data/hopeswap.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Signed-in user; `None` means signed out.
    pub user_id: Option<String>,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub swipe: SwipeConfig,
}

/// Reads the JSON config at `path`, falling back to defaults when it is
/// missing or unreadable.
pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}

/// Environment wins over the file for the signed-in user.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(user_id) = std::env::var(USER_ID_ENV) {
        let user_id = user_id.trim();
        if !user_id.is_empty() {
            log::info!("Using user id from {USER_ID_ENV}");
            config.user_id = Some(user_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::RollbackPolicy;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.swipe.distance_threshold, 100.0);
        assert_eq!(config.sync.reconnect.initial_backoff_ms, 500);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        let contents = r#"{
            "user_id": "alice",
            "store": { "backend": "sqlite" },
            "sync": { "rollback": "mark_failed" }
        }"#;
        fs::write(&path, contents).unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.user_id.as_deref(), Some("alice"));
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.sqlite_path, "data/hopeswap.db");
        assert_eq!(config.sync.rollback, RollbackPolicy::MarkFailed);
        assert_eq!(config.swipe.exit_duration_ms, 300);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let path = path.to_str().unwrap();
        let mut config = AppConfig::default();
        config.user_id = Some("bob".into());
        config.swipe.distance_threshold = 80.0;

        save_config(path, &config).unwrap();
        assert_eq!(load_config(path), config);
    }
}
