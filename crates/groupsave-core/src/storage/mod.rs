//! Persistent key-value storage with per-entry expiry.
//!
//! This module provides the `LocalStore` adapter used for everything the
//! client keeps between runs (currently the session token). Values are
//! wrapped in a `StoredEntry` envelope carrying an optional expiry
//! timestamp and are serialized as JSON.
//!
//! The adapter never surfaces storage failures: unreadable, malformed or
//! expired entries read as absent, and failed writes are logged.
//!
//! Backends:
//! - `FileBackend`: one JSON file per key in a directory
//! - `MemoryBackend`: process-local map for tests and ephemeral sessions

pub mod backend;
pub mod entry;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageError};
pub use entry::StoredEntry;
pub use store::LocalStore;
