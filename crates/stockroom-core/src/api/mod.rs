//! REST API client module for the inventory backend.
//!
//! This module provides the `ApiClient`, the single place where HTTP requests
//! are made. Every request passes through two interceptors:
//!
//! - request: attach `Authorization: Bearer <token>` when a token is stored
//! - response: on HTTP 401, clear the session before the error propagates

pub mod client;
pub mod error;

pub use client::{ApiClient, ItemQuery};
pub use error::ApiError;
