use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::User;
use crate::router::LOGIN_PATH;

use super::storage::TokenStorage;

/// Buffer size for the session event channel.
/// Receivers that fall further behind skip ahead to the newest events.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// What the client does after the backend answers 401.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedPolicy {
    /// Clear the session only
    Clear,
    /// Clear the session and send the router to the login page
    #[default]
    Redirect,
}

impl std::str::FromStr for UnauthorizedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Self::Clear),
            "redirect" => Ok(Self::Redirect),
            other => Err(anyhow::anyhow!("Unknown unauthorized policy: {}", other)),
        }
    }
}

/// In-memory session: the bearer token and the lazily loaded user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// State-change notifications for anything that depends on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    UserLoaded { username: String },
    LoggedOut,
    /// The backend rejected the token. `redirect_to` is set when the
    /// router should move to the login page.
    Expired { redirect_to: Option<String> },
}

struct Inner {
    state: RwLock<SessionState>,
    storage: Arc<dyn TokenStorage>,
    events: broadcast::Sender<SessionEvent>,
    policy: UnauthorizedPolicy,
}

/// Shared handle on the session, passed to the API client, the auth store and
/// the router. Clone is cheap.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// Create the session, rehydrating the token from storage.
    ///
    /// A storage that cannot be read starts the session logged out.
    pub fn open(storage: Arc<dyn TokenStorage>, policy: UnauthorizedPolicy) -> Self {
        let token = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(key = storage.key(), error = %e, "Could not read stored token");
                None
            }
        };
        debug!(key = storage.key(), rehydrated = token.is_some(), "Session opened");

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(SessionState { token, user: None }),
                storage,
                events,
                policy,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    /// Run a query against the loaded user, `false` when none is loaded.
    pub fn user_matches(&self, f: impl FnOnce(&User) -> bool) -> bool {
        self.read().user.as_ref().map(f).unwrap_or(false)
    }

    /// Token as currently persisted. The request interceptor reads this
    /// before every call.
    pub fn persisted_token(&self) -> Result<Option<String>> {
        self.inner.storage.load()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Record a successful login. The token is persisted first so a storage
    /// failure leaves the session untouched.
    pub(crate) fn establish(&self, token: String, user: User) -> Result<()> {
        self.inner.storage.save(&token)?;
        let username = user.username.clone();
        {
            let mut state = self.write();
            state.token = Some(token);
            state.user = Some(user);
        }
        self.emit(SessionEvent::LoggedIn { username });
        Ok(())
    }

    pub(crate) fn set_user(&self, user: User) {
        let username = user.username.clone();
        self.write().user = Some(user);
        self.emit(SessionEvent::UserLoaded { username });
    }

    fn reset(&self) {
        *self.write() = SessionState::default();
        if let Err(e) = self.inner.storage.clear() {
            warn!(key = self.inner.storage.key(), error = %e, "Could not remove stored token");
        }
    }

    /// Forget token and user, in memory and in storage. Never fails.
    pub(crate) fn clear(&self) {
        self.reset();
        self.emit(SessionEvent::LoggedOut);
    }

    /// Called by the response interceptor on HTTP 401.
    pub(crate) fn expire(&self) {
        warn!("Backend rejected the session token, clearing session");
        self.reset();
        let redirect_to = match self.inner.policy {
            UnauthorizedPolicy::Redirect => Some(LOGIN_PATH.to_string()),
            UnauthorizedPolicy::Clear => None,
        };
        self.emit(SessionEvent::Expired { redirect_to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStorage;

    fn user(username: &str) -> User {
        User {
            id: 1,
            username: username.to_string(),
            email: None,
            roles: Default::default(),
            permissions: ["view_items".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_open_rehydrates_token() {
        let storage = Arc::new(MemoryTokenStorage::with_token("access_token", "persisted"));
        let session = SessionContext::open(storage, UnauthorizedPolicy::Redirect);
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("persisted"));
        assert!(session.user().is_none());
    }

    #[test]
    fn test_open_without_token() {
        let storage = Arc::new(MemoryTokenStorage::new("access_token"));
        let session = SessionContext::open(storage, UnauthorizedPolicy::Redirect);
        assert!(!session.is_authenticated());
        assert!(!session.user_matches(|u| u.has_permission("view_items")));
    }

    #[test]
    fn test_establish_and_clear() {
        let storage = Arc::new(MemoryTokenStorage::new("access_token"));
        let session = SessionContext::open(storage.clone(), UnauthorizedPolicy::Redirect);
        let mut events = session.subscribe();

        session.establish("tok".into(), user("alice")).unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("tok"));
        assert!(session.user_matches(|u| u.has_permission("view_items")));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedIn { username: "alice".into() }
        );

        session.clear();
        assert_eq!(session.snapshot(), SessionState::default());
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn test_expire_follows_policy() {
        let storage = Arc::new(MemoryTokenStorage::with_token("access_token", "old"));
        let session = SessionContext::open(storage.clone(), UnauthorizedPolicy::Clear);
        let mut events = session.subscribe();

        session.expire();
        assert!(!session.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired { redirect_to: None });

        let storage = Arc::new(MemoryTokenStorage::with_token("access_token", "old"));
        let session = SessionContext::open(storage, UnauthorizedPolicy::Redirect);
        let mut events = session.subscribe();
        session.expire();
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Expired { redirect_to: Some(LOGIN_PATH.to_string()) }
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("clear".parse::<UnauthorizedPolicy>().unwrap(), UnauthorizedPolicy::Clear);
        assert_eq!(" Redirect ".parse::<UnauthorizedPolicy>().unwrap(), UnauthorizedPolicy::Redirect);
        assert!("bounce".parse::<UnauthorizedPolicy>().is_err());
    }
}
