use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::state::SEED_GREETING;

/// Environment variable that overrides the configured backend endpoint
pub const BACKEND_URL_ENV: &str = "PARTCHAT_BACKEND_URL";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001/chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How a Submit behaves while an earlier backend call is still outstanding.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmitPolicy {
    /// Every Submit dispatches its own call immediately; replies are
    /// appended in arrival order.
    #[default]
    Concurrent,
    /// One call at a time; later queries wait their turn, so replies keep
    /// submission order.
    Serialized,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub greeting: String,
    pub submit_policy: SubmitPolicy,
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            greeting: SEED_GREETING.to_string(),
            submit_policy: SubmitPolicy::default(),
            log_filter: None,
        }
    }

    /// Load from the user config file, falling back to defaults when it
    /// doesn't exist, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend_url = url;
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("partchat").join("config.json"))
    }

    /// Directory for log files and transcript exports
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("partchat"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.greeting, SEED_GREETING);
        assert_eq!(config.submit_policy, SubmitPolicy::Concurrent);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.backend_url = "http://example.test/chat".to_string();
        config.submit_policy = SubmitPolicy::Serialized;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.backend_url, "http://example.test/chat");
        assert_eq!(loaded.submit_policy, SubmitPolicy::Serialized);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "request_timeout_secs": 5 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_backend_url() {
        let mut config = Config::new();

        std::env::set_var(BACKEND_URL_ENV, "http://override.test/chat");
        config.apply_env();
        assert_eq!(config.backend_url, "http://override.test/chat");

        // Blank values leave the configured URL alone
        config.backend_url = DEFAULT_BACKEND_URL.to_string();
        std::env::set_var(BACKEND_URL_ENV, "   ");
        config.apply_env();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);

        std::env::remove_var(BACKEND_URL_ENV);
        config.apply_env();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }
}
