//! Static route table.
//!
//! Every view is loaded lazily: its loader only runs once the guard has let
//! the navigation through.

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;

use crate::api::{ApiClient, ApiError, ItemQuery};
use crate::models::{Item, ItemType, Location, Tag, User, UserAccount};

use super::location::RouteLocation;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// Loads the data a view needs. Runs after the guard allowed the navigation.
pub type ViewLoader =
    for<'a> fn(&'a ApiClient, &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>>;

/// A loaded view and the data it displays.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum View {
    Login,
    Items(Vec<Item>),
    Locations(Vec<Location>),
    Tags(Vec<Tag>),
    ItemTypes(Vec<ItemType>),
    Scanner,
    Users(Vec<UserAccount>),
    Profile(User),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Login => "Login",
            View::Items(_) => "Items",
            View::Locations(_) => "Locations",
            View::Tags(_) => "Tags",
            View::ItemTypes(_) => "ItemTypes",
            View::Scanner => "Scanner",
            View::Users(_) => "Users",
            View::Profile(_) => "Profile",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub permission: Option<&'static str>,
}

impl RouteMeta {
    const fn public() -> Self {
        Self {
            requires_auth: false,
            permission: None,
        }
    }

    const fn authenticated() -> Self {
        Self {
            requires_auth: true,
            permission: None,
        }
    }

    const fn permission(permission: &'static str) -> Self {
        Self {
            requires_auth: true,
            permission: Some(permission),
        }
    }
}

#[derive(Clone, Copy)]
pub enum RouteTarget {
    Redirect(&'static str),
    View { loader: ViewLoader, meta: RouteMeta },
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteTarget::Redirect(to) => f.debug_tuple("Redirect").field(to).finish(),
            RouteTarget::View { meta, .. } => f.debug_struct("View").field("meta", meta).finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouteDescriptor {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub target: RouteTarget,
}

impl RouteDescriptor {
    /// Redirect records carry no metadata of their own.
    pub fn meta(&self) -> RouteMeta {
        match self.target {
            RouteTarget::View { meta, .. } => meta,
            RouteTarget::Redirect(_) => RouteMeta::default(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.path.eq_ignore_ascii_case(path)
    }
}

pub static ROUTES: &[RouteDescriptor] = &[
    RouteDescriptor {
        path: LOGIN_PATH,
        name: Some("Login"),
        target: RouteTarget::View { loader: load_login, meta: RouteMeta::public() },
    },
    RouteDescriptor {
        path: HOME_PATH,
        name: None,
        target: RouteTarget::Redirect("/items"),
    },
    RouteDescriptor {
        path: "/items",
        name: Some("Items"),
        target: RouteTarget::View { loader: load_items, meta: RouteMeta::permission("view_items") },
    },
    RouteDescriptor {
        path: "/locations",
        name: Some("Locations"),
        target: RouteTarget::View { loader: load_locations, meta: RouteMeta::permission("view_locations") },
    },
    RouteDescriptor {
        path: "/tags",
        name: Some("Tags"),
        target: RouteTarget::View { loader: load_tags, meta: RouteMeta::permission("view_tags") },
    },
    RouteDescriptor {
        path: "/item-types",
        name: Some("ItemTypes"),
        target: RouteTarget::View { loader: load_item_types, meta: RouteMeta::permission("view_items") },
    },
    RouteDescriptor {
        path: "/scanner",
        name: Some("Scanner"),
        target: RouteTarget::View { loader: load_scanner, meta: RouteMeta::authenticated() },
    },
    RouteDescriptor {
        path: "/users",
        name: Some("Users"),
        target: RouteTarget::View { loader: load_users, meta: RouteMeta::permission("manage_users") },
    },
    RouteDescriptor {
        path: "/profile",
        name: Some("Profile"),
        target: RouteTarget::View { loader: load_profile, meta: RouteMeta::authenticated() },
    },
];

// ===== View Loaders =====

fn load_login<'a>(_: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    futures::future::ready(Ok(View::Login)).boxed()
}

fn load_scanner<'a>(_: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    futures::future::ready(Ok(View::Scanner)).boxed()
}

fn load_items<'a>(api: &'a ApiClient, to: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    async move {
        let query = ItemQuery::from_pairs(to.query_pairs());
        Ok(View::Items(api.fetch_items(&query).await?))
    }
    .boxed()
}

fn load_locations<'a>(api: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    async move { Ok(View::Locations(api.fetch_locations().await?)) }.boxed()
}

fn load_tags<'a>(api: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    async move { Ok(View::Tags(api.fetch_tags().await?)) }.boxed()
}

fn load_item_types<'a>(api: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    async move { Ok(View::ItemTypes(api.fetch_item_types().await?)) }.boxed()
}

fn load_users<'a>(api: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    async move { Ok(View::Users(api.fetch_users().await?)) }.boxed()
}

fn load_profile<'a>(api: &'a ApiClient, _: &'a RouteLocation) -> BoxFuture<'a, Result<View, ApiError>> {
    async move { Ok(View::Profile(api.current_user().await?)) }.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(path: &str) -> &'static RouteDescriptor {
        ROUTES.iter().find(|r| r.matches(path)).expect("route exists")
    }

    #[test]
    fn test_route_paths_unique() {
        for (i, a) in ROUTES.iter().enumerate() {
            for b in &ROUTES[i + 1..] {
                assert_ne!(a.path, b.path);
            }
        }
    }

    #[test]
    fn test_route_metadata() {
        assert_eq!(find("/login").meta(), RouteMeta { requires_auth: false, permission: None });
        assert_eq!(find("/users").meta().permission, Some("manage_users"));
        assert_eq!(find("/item-types").meta().permission, Some("view_items"));
        assert_eq!(find("/locations").meta().permission, Some("view_locations"));
        assert_eq!(find("/tags").meta().permission, Some("view_tags"));
        assert!(find("/scanner").meta().requires_auth);
        assert_eq!(find("/profile").meta().permission, None);
    }

    #[test]
    fn test_home_redirects_to_items() {
        assert!(matches!(find("/").target, RouteTarget::Redirect("/items")));
    }

    #[test]
    fn test_every_redirect_points_at_a_route() {
        for route in ROUTES {
            if let RouteTarget::Redirect(to) = route.target {
                assert!(ROUTES.iter().any(|r| r.matches(to)), "dangling redirect {}", to);
            }
        }
    }

    #[test]
    fn test_view_serializes_tagged() {
        let json = serde_json::to_value(View::Tags(vec![])).unwrap();
        assert_eq!(json, serde_json::json!({"view": "tags", "data": []}));
        assert_eq!(View::Scanner.name(), "Scanner");
    }
}
