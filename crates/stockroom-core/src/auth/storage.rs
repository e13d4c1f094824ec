//! Persisted storage for the bearer token.
//!
//! The session keeps exactly one persisted value: the token, under a single
//! configurable key. It is read at startup and before every outgoing request,
//! written on login and deleted on logout or when the backend answers 401.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token file name in cache directory
const TOKEN_FILE: &str = "session.json";

/// Backend holding the persisted bearer token.
pub trait TokenStorage: Send + Sync {
    /// Key the token is stored under
    fn key(&self) -> &str;

    fn load(&self) -> Result<Option<String>>;

    fn save(&self, token: &str) -> Result<()>;

    /// Remove the token. Removing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Tokens kept in a JSON file, one entry per key.
pub struct FileTokenStorage {
    path: PathBuf,
    key: String,
}

impl FileTokenStorage {
    pub fn new(cache_dir: &Path, key: impl Into<String>) -> Self {
        Self {
            path: cache_dir.join(TOKEN_FILE),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, StoredToken>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write_entries(&self, entries: &BTreeMap<String, StoredToken>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }

    /// When the current token was written, if one is stored
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read_entries()?.get(&self.key).map(|t| t.saved_at))
    }
}

impl TokenStorage for FileTokenStorage {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(&self.key).map(|t| t.token))
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(
            self.key.clone(),
            StoredToken {
                token: token.to_string(),
                saved_at: Utc::now(),
            },
        );
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(&self.key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// In-process storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStorage {
    key: String,
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot: Mutex::new(None),
        }
    }

    pub fn with_token(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
