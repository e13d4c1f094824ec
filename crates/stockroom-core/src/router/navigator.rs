//! Router: resolves paths against the route table, runs the guard and loads
//! the target view.

use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::auth::{AuthStore, SessionEvent};

use super::guard::{guard, GuardDecision};
use super::location::RouteLocation;
use super::routes::{RouteDescriptor, RouteTarget, View, ViewLoader, HOME_PATH, LOGIN_PATH, ROUTES};

/// Redirect hops allowed within one navigation before giving up.
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),

    #[error("Failed to load view: {0}")]
    View(#[from] ApiError),
}

/// A route after static redirects have been followed.
#[derive(Clone)]
pub struct ResolvedRoute {
    pub route: &'static RouteDescriptor,
    pub location: RouteLocation,
    loader: ViewLoader,
}

impl std::fmt::Debug for ResolvedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedRoute")
            .field("route", self.route)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl ResolvedRoute {
    pub fn name(&self) -> Option<&'static str> {
        self.route.name
    }
}

/// Result of a completed navigation.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub location: RouteLocation,
    pub view: View,
    /// Set when the guard or a redirect record sent us somewhere else
    pub redirected_from: Option<String>,
}

pub struct Router {
    routes: &'static [RouteDescriptor],
    store: AuthStore,
    events: broadcast::Receiver<SessionEvent>,
    current: Option<RouteLocation>,
}

impl Router {
    pub fn new(store: AuthStore) -> Self {
        Self::with_routes(store, ROUTES)
    }

    pub fn with_routes(store: AuthStore, routes: &'static [RouteDescriptor]) -> Self {
        let events = store.subscribe();
        Self {
            routes,
            store,
            events,
            current: None,
        }
    }

    pub fn routes(&self) -> &'static [RouteDescriptor] {
        self.routes
    }

    pub fn current(&self) -> Option<&RouteLocation> {
        self.current.as_ref()
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    /// Match a path and follow redirect records.
    pub fn resolve(&self, path: &str) -> Result<ResolvedRoute, RouterError> {
        let mut location = RouteLocation::parse(path);
        for _ in 0..=MAX_REDIRECTS {
            let route = self
                .routes
                .iter()
                .find(|r| r.matches(&location.path))
                .ok_or_else(|| RouterError::NotFound(location.path.clone()))?;

            match route.target {
                RouteTarget::View { loader, .. } => {
                    return Ok(ResolvedRoute { route, location, loader });
                }
                RouteTarget::Redirect(to) => {
                    // Query parameters survive the redirect
                    location = RouteLocation {
                        path: RouteLocation::new(to).path,
                        query: location.query,
                    };
                }
            }
        }
        Err(RouterError::RedirectLoop(path.to_string()))
    }

    /// Navigate to `path`, following guard redirects, and load the view.
    pub async fn navigate(&mut self, path: &str) -> Result<Navigation, RouterError> {
        self.sync();

        let requested = RouteLocation::parse(path).full_path();
        let mut target = requested.clone();
        let mut hops = 0;

        let resolved = loop {
            let resolved = self.resolve(&target)?;
            let decision = guard(&resolved.location, resolved.route.meta(), &self.store).await;
            let next = match decision {
                GuardDecision::Allow => break resolved,
                GuardDecision::RedirectToLogin { redirect } => {
                    let login = RouteLocation::new(LOGIN_PATH);
                    match redirect {
                        Some(r) => login.with_query("redirect", r),
                        None => login,
                    }
                }
                GuardDecision::RedirectHome => RouteLocation::new(HOME_PATH),
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(RouterError::RedirectLoop(requested));
            }
            debug!(from = %resolved.location, to = %next, "Guard redirected navigation");
            target = next.full_path();
        };

        let view = match (resolved.loader)(self.store.api(), &resolved.location).await {
            Ok(view) => view,
            Err(e) => {
                // A 401 while loading leaves a pending expiry event
                self.sync();
                return Err(e.into());
            }
        };

        let location = resolved.location;
        let redirected_from = (location.full_path() != requested).then_some(requested);
        debug!(to = %location, view = view.name(), "Navigation complete");
        self.current = Some(location.clone());

        Ok(Navigation {
            location,
            view,
            redirected_from,
        })
    }

    /// Apply pending session events. Returns the new location when an
    /// expired session moved the router to the login page.
    pub fn sync(&mut self) -> Option<RouteLocation> {
        let mut redirect = None;
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Expired { redirect_to: Some(to) }) => redirect = Some(to),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Router missed session events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        let to = RouteLocation::parse(&redirect?);
        info!(to = %to, "Session expired, redirecting");
        self.current = Some(to.clone());
        Some(to)
    }
}
