use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Unauthorized - session expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(anyhow::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload returned by the inventory backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the `error` field out of a JSON body, falling back to the raw text.
    pub(crate) fn message_from_body(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::message_from_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// Re-label a backend rejection of credentials or account data.
    ///
    /// `Unauthorized` is left alone: on an authenticated call it means the
    /// session expired, which callers handle differently from a rejection.
    pub fn into_auth_failure(self) -> Self {
        match self {
            ApiError::BadRequest(msg) | ApiError::AccessDenied(msg) => ApiError::AuthFailure(msg),
            other => other,
        }
    }

    /// True when the error means the stored credentials are no longer valid.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_error_field() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, r#"{"error": "Insufficient permissions"}"#);
        match err {
            ApiError::AccessDenied(msg) => assert_eq!(msg, "Insufficient permissions"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_REQUEST, "x"), ApiError::BadRequest(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, "x"), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, "x"), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, "x"), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let msg = ApiError::message_from_body(&body);
        assert!(msg.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(msg.ends_with(&format!("(truncated, {} total bytes)", body.len())));
    }

    #[test]
    fn test_into_auth_failure() {
        let err = ApiError::BadRequest("Username already exists".into()).into_auth_failure();
        assert!(matches!(err, ApiError::AuthFailure(ref m) if m == "Username already exists"));

        // Session expiry is not a credential rejection
        assert!(ApiError::Unauthorized.into_auth_failure().is_session_expired());
    }
}
