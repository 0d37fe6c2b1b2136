//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the login/register/logout/rehydrate state machine
//! - `SessionSnapshot`: the published view of identity, loading and error
//!
//! The bearer token is persisted under `TOKEN_KEY` and expires after
//! `TOKEN_TTL_HOURS` hours.

pub mod session;

pub use session::{
    token_ttl, SessionSnapshot, SessionState, SessionStore, TOKEN_KEY, TOKEN_TTL_HOURS,
};
