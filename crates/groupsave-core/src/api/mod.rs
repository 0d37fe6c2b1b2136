//! REST API client module for the savings backend.
//!
//! This module provides the `ApiClient` for talking to the backend's auth,
//! user, group and transaction endpoints, and the `ApiError` fault every
//! call returns.
//!
//! The API uses bearer token authentication. The token is read from the
//! persistent store before each request.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthPayload, DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, INVALID_RESPONSE_MESSAGE, SESSION_EXPIRED_MESSAGE};
