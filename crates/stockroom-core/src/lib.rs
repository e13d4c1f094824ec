//! Stockroom core library.
//!
//! Client side of an inventory-management application: an HTTP client that
//! injects the bearer token and reacts to expired sessions, a session store
//! with permission queries, and a router whose navigation guard consults it.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod router;

pub use api::{ApiClient, ApiError};
pub use app::App;
pub use auth::{AuthStore, SessionContext, SessionEvent};
pub use config::Config;
pub use router::{Navigation, Router, RouterError, View};
