//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionContext`: shared token/user state with change notifications
//! - `AuthStore`: login, logout, user loading and permission queries
//! - `TokenStorage`: where the bearer token is persisted (file, OS keychain
//!   or memory)

pub mod keychain;
pub mod session;
pub mod storage;
pub mod store;

pub use keychain::KeyringTokenStorage;
pub use session::{SessionContext, SessionEvent, SessionState, UnauthorizedPolicy};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::AuthStore;
