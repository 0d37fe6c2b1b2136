use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for every persisted value.
///
/// Serialized as `{"value": ..., "expiresAt": <epoch millis> | null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    pub value: T,
    #[serde(
        rename = "expiresAt",
        default,
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl<T> StoredEntry<T> {
    /// Wrap a value. A missing or zero TTL means the entry never expires.
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        let expires_at = ttl
            .filter(|ttl| *ttl != Duration::zero())
            .map(|ttl| Utc::now() + ttl);
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry is checked at millisecond resolution, matching what is stored.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now.timestamp_millis() > expires_at.timestamp_millis(),
            None => false,
        }
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expires_at| expires_at - Utc::now())
    }
}
