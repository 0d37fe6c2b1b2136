//! API client for communicating with the savings backend REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests for the session, group and transaction endpoints.

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::TOKEN_KEY;
use crate::models::{
    CurrentUser, Group, GroupUpdate, JoinResponse, LoginRequest, MessageResponse, NewGroup,
    NewTransaction, ProfileUpdate, RegisterRequest, StatusUpdate, Transaction, TransactionStatus,
};
use crate::storage::LocalStore;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Body of a successful login or registration.
///
/// Both fields are optional here; the session store decides what a usable
/// response is.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub user: Option<CurrentUser>,
    #[serde(default)]
    pub token: Option<String>,
}

/// API client for the savings backend.
///
/// Clone is cheap: `reqwest::Client` shares its connection pool and
/// `LocalStore` shares its backend. The bearer token is read from the store
/// before every request, so an expired token is never sent.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: LocalStore,
}

impl ApiClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: impl Into<String>, store: LocalStore) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, store, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        store: LocalStore,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.store.read::<String>(TOKEN_KEY) {
            match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "Stored token is not a valid header value, sending unauthenticated"),
            }
        }
        headers
    }

    /// Check if response is successful, returning an error built from the body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %ApiError::truncate_body(&body), "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Unwrap the `{"status": ..., "data": ...}` envelope. Bodies without a
    /// `data` member are returned as they are; an empty body is `null`.
    fn normalize_body(text: &str) -> Result<Value, ApiError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, body = %ApiError::truncate_body(text), "Response body is not JSON");
            ApiError::invalid_response()
        })?;

        Ok(match value {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        })
    }

    /// Send a request and decode the normalized body.
    ///
    /// Faults come back as `ApiError`; 401 responses keep their status so
    /// the caller can invalidate the session. Nothing is retried.
    pub async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(%method, url = %url, error = %e, "Request failed to send");
            ApiError::from(e)
        })?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        let value = Self::normalize_body(&text)?;
        serde_json::from_value(value).map_err(|e| {
            warn!(%method, url = %url, error = %e, "Unexpected response shape");
            ApiError::invalid_response()
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::POST, path, None).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }

    // ===== Auth =====

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthPayload, ApiError> {
        self.post("/auth/login", credentials).await
    }

    pub async fn register(&self, details: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        self.post("/auth/register", details).await
    }

    /// The response body is ignored.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.post_empty::<Value>("/auth/logout").await.map(|_| ())
    }

    // ===== Users =====

    pub async fn fetch_current_user(&self) -> Result<CurrentUser, ApiError> {
        self.get("/users/me").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<CurrentUser, ApiError> {
        self.put("/users/me", update).await
    }

    // ===== Groups =====

    pub async fn fetch_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.get("/groups").await
    }

    pub async fn fetch_group(&self, group_id: i64) -> Result<Group, ApiError> {
        self.get(&format!("/groups/{}", group_id)).await
    }

    pub async fn create_group(&self, group: &NewGroup) -> Result<Group, ApiError> {
        self.post("/groups", group).await
    }

    pub async fn update_group(&self, group_id: i64, update: &GroupUpdate) -> Result<Group, ApiError> {
        self.put(&format!("/groups/{}", group_id), update).await
    }

    pub async fn delete_group(&self, group_id: i64) -> Result<MessageResponse, ApiError> {
        self.delete(&format!("/groups/{}", group_id)).await
    }

    pub async fn join_group(&self, group_id: i64) -> Result<JoinResponse, ApiError> {
        self.post_empty(&format!("/groups/{}/join", group_id)).await
    }

    pub async fn leave_group(&self, group_id: i64) -> Result<MessageResponse, ApiError> {
        self.post_empty(&format!("/groups/{}/leave", group_id)).await
    }

    // ===== Transactions =====

    /// Newest first, as ordered by the server.
    pub async fn fetch_group_transactions(&self, group_id: i64) -> Result<Vec<Transaction>, ApiError> {
        self.get(&format!("/groups/{}/transactions", group_id)).await
    }

    pub async fn create_contribution(&self, contribution: &NewTransaction) -> Result<Transaction, ApiError> {
        self.post("/transactions", contribution).await
    }

    pub async fn request_withdrawal(&self, withdrawal: &NewTransaction) -> Result<Transaction, ApiError> {
        self.post("/withdrawals", withdrawal).await
    }

    pub async fn update_withdrawal_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<Transaction, ApiError> {
        self.put(
            &format!("/withdrawals/{}", transaction_id),
            &StatusUpdate { status },
        )
        .await
    }
}
