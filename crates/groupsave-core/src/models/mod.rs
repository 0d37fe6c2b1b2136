//! Data models for the savings backend.
//!
//! This module contains the data structures exchanged with the API:
//!
//! - `CurrentUser` and the auth/profile request bodies
//! - `Group`, `Membership` and group request bodies
//! - `Transaction` (contributions and withdrawals) and its request bodies

pub mod group;
pub mod transaction;
pub mod user;

pub use group::{Group, GroupUpdate, JoinResponse, Membership, MessageResponse, NewGroup};
pub use transaction::{
    NewTransaction, StatusUpdate, Transaction, TransactionKind, TransactionStatus,
};
pub use user::{CurrentUser, LoginRequest, ProfileUpdate, RegisterRequest};
