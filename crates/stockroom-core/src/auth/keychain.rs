use anyhow::{Context, Result};
use keyring::Entry;

use super::storage::TokenStorage;

const SERVICE_NAME: &str = "stockroom";

/// Token kept in the OS keychain, with the storage key as the account name.
///
/// One `Entry` is held for the lifetime of the storage so every call talks
/// to the same credential.
pub struct KeyringTokenStorage {
    key: String,
    entry: Entry,
}

impl KeyringTokenStorage {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let entry = Entry::new(SERVICE_NAME, &key).context("Failed to create keyring entry")?;
        Ok(Self { key, entry })
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
