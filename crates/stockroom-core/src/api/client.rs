//! API client for the inventory backend.
//!
//! `ApiClient` wraps a shared `reqwest::Client` with the backend base URL
//! and the session it authenticates against.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionContext;
use crate::models::user::LoginRequest;
use crate::models::{
    Item, ItemType, Location, LoginResponse, ProfileUpdate, RegisterRequest, RegisteredUser, Tag,
    User, UserAccount,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const AUTH_LOGIN_PATH: &str = "/api/auth/login";
const ME_PATH: &str = "/api/auth/me";
const REGISTER_PATH: &str = "/api/auth/register";

/// Filters accepted by the item listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type_id: Option<String>,
}

impl ItemQuery {
    /// Build from route query pairs, ignoring keys the backend does not filter on.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key {
                "search" => query.search = Some(value.to_string()),
                "location_id" => query.location_id = Some(value.to_string()),
                "item_type_id" => query.item_type_id = Some(value.to_string()),
                _ => {}
            }
        }
        query
    }
}

/// API client for the inventory backend.
/// Clone is cheap - reqwest::Client and the session share their state.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionContext) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        session: SessionContext,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Interceptors =====

    /// Request interceptor: attach the persisted bearer token, if any.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.persisted_token() {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                warn!(error = %e, "Could not read stored token, sending request without it");
                request
            }
        }
    }

    /// Response interceptor: a 401 clears the session before the error
    /// reaches the caller.
    async fn intercept(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.session.expire();
            return Err(ApiError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;
        self.intercept(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self.execute(self.client.get(self.url(path))).await?;
        Self::decode(response, path).await
    }

    async fn get_with_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self.execute(self.client.get(self.url(path)).query(query)).await?;
        Self::decode(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        debug!(path, "POST");
        let response = self.execute(self.client.post(self.url(path)).json(body)).await?;
        Self::decode(response, path).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        debug!(path, "PUT");
        let response = self.execute(self.client.put(self.url(path)).json(body)).await?;
        Self::decode(response, path).await
    }

    // ===== Auth Endpoints =====

    /// Exchange credentials for a token.
    ///
    /// The stored token is attached like on any other request. A rejected
    /// login is reported as `AuthFailure`; it does not go through the 401
    /// interceptor, so an existing session is left alone.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.url(AUTH_LOGIN_PATH);
        debug!(url = %url, username, "Sending login request");

        let request = self.client.post(&url).json(&LoginRequest { username, password });
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 | 401 | 403 => ApiError::AuthFailure(ApiError::message_from_body(&body)),
                _ => ApiError::from_status(status, &body),
            });
        }
        Self::decode(response, AUTH_LOGIN_PATH).await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get(ME_PATH).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.put(ME_PATH, update).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser, ApiError> {
        self.post(REGISTER_PATH, request)
            .await
            .map_err(ApiError::into_auth_failure)
    }

    // ===== Inventory Endpoints =====

    pub async fn fetch_items(&self, query: &ItemQuery) -> Result<Vec<Item>, ApiError> {
        self.get_with_query("/api/items", query).await
    }

    pub async fn fetch_locations(&self) -> Result<Vec<Location>, ApiError> {
        self.get("/api/locations").await
    }

    pub async fn fetch_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.get("/api/tags").await
    }

    pub async fn fetch_item_types(&self) -> Result<Vec<ItemType>, ApiError> {
        self.get("/api/item_types").await
    }

    pub async fn fetch_users(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.get("/api/users").await
    }
}
