//! Navigation guard run before every route change.

use tracing::debug;

use crate::auth::AuthStore;

use super::location::RouteLocation;
use super::routes::{RouteMeta, LOGIN_PATH};

/// Outcome of guarding one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// `redirect` holds the path to return to after logging in
    RedirectToLogin { redirect: Option<String> },
    RedirectHome,
}

/// Decide whether the navigation to `to` may proceed.
///
/// Checks run in order: public routes, missing token, lazy user load,
/// required permission.
pub async fn guard(to: &RouteLocation, meta: RouteMeta, store: &AuthStore) -> GuardDecision {
    if !meta.requires_auth {
        if store.is_authenticated() && to.path == LOGIN_PATH {
            debug!("Already logged in, leaving login page");
            return GuardDecision::RedirectHome;
        }
        return GuardDecision::Allow;
    }

    if !store.is_authenticated() {
        return GuardDecision::RedirectToLogin {
            redirect: Some(to.full_path()),
        };
    }

    if store.user().is_none() {
        if let Err(e) = store.fetch_user().await {
            debug!(error = %e, "Could not load user during navigation");
            return GuardDecision::RedirectToLogin { redirect: None };
        }
    }

    if let Some(permission) = meta.permission {
        if !store.has_permission(permission) {
            debug!(permission, path = %to.path, "Missing permission");
            return GuardDecision::RedirectHome;
        }
    }

    GuardDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    use crate::auth::store::tests::{store_for, ADMIN_JSON, VIEWER_JSON};
    use crate::auth::TokenStorage;

    const USERS_META: RouteMeta = RouteMeta {
        requires_auth: true,
        permission: Some("manage_users"),
    };

    const ITEMS_META: RouteMeta = RouteMeta {
        requires_auth: true,
        permission: Some("view_items"),
    };

    #[tokio::test]
    async fn test_unauthenticated_redirects_to_login_with_return_path() {
        let server = Server::new_async().await;
        let (store, _) = store_for(&server, None);

        let decision = guard(&RouteLocation::new("/items"), ITEMS_META, &store).await;
        assert_eq!(
            decision,
            GuardDecision::RedirectToLogin { redirect: Some("/items".into()) }
        );
    }

    #[tokio::test]
    async fn test_public_route_allowed() {
        let server = Server::new_async().await;
        let (store, _) = store_for(&server, None);
        let decision = guard(&RouteLocation::new(LOGIN_PATH), RouteMeta::default(), &store).await;
        assert_eq!(decision, GuardDecision::Allow);
    }

    #[tokio::test]
    async fn test_authenticated_user_leaves_login() {
        let server = Server::new_async().await;
        let (store, _) = store_for(&server, Some("jwt"));
        let decision = guard(&RouteLocation::new(LOGIN_PATH), RouteMeta::default(), &store).await;
        assert_eq!(decision, GuardDecision::RedirectHome);
    }

    #[tokio::test]
    async fn test_missing_permission_redirects_home() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/auth/me")
            .with_status(200)
            .with_body(VIEWER_JSON)
            .create_async()
            .await;
        let (store, _) = store_for(&server, Some("jwt"));

        let decision = guard(&RouteLocation::new("/users"), USERS_META, &store).await;
        assert_eq!(decision, GuardDecision::RedirectHome);
    }

    #[tokio::test]
    async fn test_user_loaded_lazily_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/auth/me")
            .with_status(200)
            .with_body(ADMIN_JSON)
            .expect(1)
            .create_async()
            .await;
        let (store, _) = store_for(&server, Some("jwt"));

        assert_eq!(guard(&RouteLocation::new("/users"), USERS_META, &store).await, GuardDecision::Allow);
        assert_eq!(guard(&RouteLocation::new("/items"), ITEMS_META, &store).await, GuardDecision::Allow);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_user_load_failure_redirects_to_login() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/auth/me")
            .with_status(401)
            .create_async()
            .await;
        let (store, storage) = store_for(&server, Some("expired"));

        let profile_meta = RouteMeta { requires_auth: true, permission: None };
        let decision = guard(&RouteLocation::new("/profile"), profile_meta, &store).await;
        assert_eq!(decision, GuardDecision::RedirectToLogin { redirect: None });
        assert!(!store.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
    }
}
