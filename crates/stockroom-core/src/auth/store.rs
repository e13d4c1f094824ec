//! Session store: the actions that change who is logged in, and the queries
//! the router and views make against the session.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{ProfileUpdate, RegisterRequest, RegisteredUser, User};

use super::session::{SessionContext, SessionEvent, SessionState};

/// Clone is cheap - both fields are shared handles.
#[derive(Clone)]
pub struct AuthStore {
    api: ApiClient,
    session: SessionContext,
}

impl AuthStore {
    pub fn new(api: ApiClient) -> Self {
        let session = api.session().clone();
        Self { api, session }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ===== Queries =====

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.session.user_matches(|u| u.has_role(role))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.session.user_matches(|u| u.has_permission(permission))
    }

    pub fn user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn token(&self) -> Option<String> {
        self.session.token()
    }

    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    // ===== Actions =====

    /// Log in and persist the returned token.
    /// On failure the session is exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = match self.api.login(username, password).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username, error = %e, "Login failed");
                return Err(e);
            }
        };
        self.session
            .establish(response.access_token, response.user)
            .map_err(ApiError::Storage)?;
        info!(username, "Logged in");
        Ok(())
    }

    /// Forget the session. Always succeeds.
    pub fn logout(&self) {
        self.session.clear();
        info!("Logged out");
    }

    /// Load the current user. Any failure logs the session out before the
    /// error is returned.
    pub async fn fetch_user(&self) -> Result<User, ApiError> {
        match self.api.current_user().await {
            Ok(user) => {
                debug!(username = %user.username, "Fetched current user");
                self.session.set_user(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch user");
                self.logout();
                Err(e)
            }
        }
    }

    /// Create an account. The session is not touched.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser, ApiError> {
        self.api.register(request).await.inspect_err(|e| {
            warn!(username = %request.username, error = %e, "Registration failed");
        })
    }

    /// Update the current user's profile and adopt the server's copy.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user = self.api.update_profile(update).await.inspect_err(|e| {
            warn!(error = %e, "Profile update failed");
        })?;
        self.session.set_user(user.clone());
        Ok(user)
    }
}
