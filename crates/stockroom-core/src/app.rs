//! Application context.
//!
//! `App` owns the shared client state: the configuration, the session, the
//! API client, the auth store and the router. It is built once by
//! `App::start` and torn down by `App::shutdown`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::auth::{
    AuthStore, FileTokenStorage, KeyringTokenStorage, MemoryTokenStorage, SessionContext,
    TokenStorage,
};
use crate::config::{Config, TokenStorageKind};
use crate::router::{Navigation, Router, RouterError, HOME_PATH};

pub struct App {
    config: Config,
    store: AuthStore,
    router: Router,
}

impl App {
    /// Build the context from configuration, rehydrating any stored token.
    pub fn start(config: Config) -> Result<Self> {
        let storage: Arc<dyn TokenStorage> = match config.token_storage {
            TokenStorageKind::File => {
                let cache_dir = config.cache_dir()?;
                Arc::new(FileTokenStorage::new(&cache_dir, config.token_key.clone()))
            }
            TokenStorageKind::Keyring => Arc::new(KeyringTokenStorage::new(config.token_key.clone())?),
            TokenStorageKind::Memory => Arc::new(MemoryTokenStorage::new(config.token_key.clone())),
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn TokenStorage>) -> Result<Self> {
        let session = SessionContext::open(storage, config.on_unauthorized);
        let api = ApiClient::with_timeout(&config.api_base_url, session, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let store = AuthStore::new(api);
        let router = Router::new(store.clone());

        info!(
            api = %config.api_base_url,
            storage = ?config.token_storage,
            authenticated = store.is_authenticated(),
            "Application started"
        );
        Ok(Self { config, store, router })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    pub async fn navigate(&mut self, path: &str) -> Result<Navigation, RouterError> {
        self.router.navigate(path).await
    }

    /// Log in, then return to the page recorded in the login route's
    /// `redirect` parameter, or home.
    ///
    /// The outer error is a rejected login and leaves the session as it was.
    /// The inner result is the navigation that follows a successful login.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Result<Navigation, RouterError>, ApiError> {
        self.store.login(username, password).await?;
        self.config.last_username = Some(username.to_string());

        let target = self
            .router
            .current()
            .and_then(|loc| loc.query_value("redirect"))
            .unwrap_or(HOME_PATH)
            .to_string();
        debug!(to = %target, "Returning after login");
        Ok(self.router.navigate(&target).await)
    }

    pub fn logout(&mut self) {
        self.store.logout();
        self.router.sync();
    }

    /// Tear the context down. The persisted token stays in storage so the
    /// next start resumes the session.
    pub fn shutdown(self) -> Config {
        info!(authenticated = self.store.is_authenticated(), "Application stopped");
        self.config
    }
}
