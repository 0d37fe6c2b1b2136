//! Core library for groupsave, a client for group savings.
//!
//! The pieces, leaves first:
//!
//! - `storage`: persistent key-value adapter with per-entry expiry
//! - `api`: REST client that attaches the stored bearer token
//! - `auth`: the session store (login, register, logout, rehydration)
//! - `notify`: fire-and-forget notifications for the front end
//!
//! A front end builds one `SessionStore`, calls `rehydrate` at start-up and
//! routes authenticated calls through `SessionStore::with_api`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionSnapshot, SessionState, SessionStore};
pub use config::Config;
pub use notify::{Notification, NotificationFeed, NotificationKind, Notifier};
pub use storage::LocalStore;
