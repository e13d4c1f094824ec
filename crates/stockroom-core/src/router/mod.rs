//! Client-side routing.
//!
//! - `ROUTES`: the static route table with per-route auth metadata
//! - `guard`: the policy check run before every navigation
//! - `Router`: resolves paths, applies the guard, loads views and follows
//!   session-expiry redirects

pub mod guard;
pub mod location;
pub mod navigator;
pub mod routes;

pub use guard::{guard, GuardDecision};
pub use location::RouteLocation;
pub use navigator::{Navigation, ResolvedRoute, Router, RouterError};
pub use routes::{RouteDescriptor, RouteMeta, RouteTarget, View, ViewLoader, HOME_PATH, LOGIN_PATH, ROUTES};
