//! Application configuration management.
//!
//! Holds the backend URL, where and under which key the session token is
//! persisted, and what happens when the backend rejects the token.
//!
//! Configuration is stored at `~/.config/stockroom/config.json`; environment
//! variables override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::UnauthorizedPolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "stockroom";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TOKEN_KEY: &str = "access_token";

/// Where the bearer token is persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStorageKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenStorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("Unknown token storage: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub token_key: String,
    pub token_storage: TokenStorageKind,
    pub on_unauthorized: UnauthorizedPolicy,
    pub request_timeout_secs: u64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            token_storage: TokenStorageKind::default(),
            on_unauthorized: UnauthorizedPolicy::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from `STOCKROOM_*` variables. `lookup` is injected so
    /// tests don't have to touch the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("STOCKROOM_API_URL") {
            self.api_base_url = url;
        }
        if let Some(key) = lookup("STOCKROOM_TOKEN_KEY") {
            self.token_key = key;
        }
        if let Some(kind) = lookup("STOCKROOM_TOKEN_STORAGE") {
            self.token_storage = kind.parse().context("Invalid STOCKROOM_TOKEN_STORAGE")?;
        }
        if let Some(policy) = lookup("STOCKROOM_ON_UNAUTHORIZED") {
            self.on_unauthorized = policy.parse().context("Invalid STOCKROOM_ON_UNAUTHORIZED")?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::auth::storage::tests::scratch_dir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://127.0.0.1:5000");
        assert_eq!(config.token_key, "access_token");
        assert_eq!(config.token_storage, TokenStorageKind::File);
        assert_eq!(config.on_unauthorized, UnauthorizedPolicy::Redirect);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = scratch_dir();
        let config = Config::load_from(&dir.join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, r#"{"token_key": "token", "on_unauthorized": "clear"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.token_key, "token");
        assert_eq!(config.on_unauthorized, UnauthorizedPolicy::Clear);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = scratch_dir();
        let path = dir.join(CONFIG_FILE);
        let config = Config {
            last_username: Some("alice".into()),
            token_storage: TokenStorageKind::Keyring,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKROOM_API_URL", "https://inventory.example.com"),
            ("STOCKROOM_TOKEN_KEY", "token"),
            ("STOCKROOM_TOKEN_STORAGE", "memory"),
            ("STOCKROOM_ON_UNAUTHORIZED", "clear"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.api_base_url, "https://inventory.example.com");
        assert_eq!(config.token_key, "token");
        assert_eq!(config.token_storage, TokenStorageKind::Memory);
        assert_eq!(config.on_unauthorized, UnauthorizedPolicy::Clear);
    }

    #[test]
    fn test_invalid_env_value_errors() {
        let mut config = Config::default();
        let result = config.apply_env(|name| {
            (name == "STOCKROOM_TOKEN_STORAGE").then(|| "floppy".to_string())
        });
        assert!(result.is_err());
    }
}
