//! Cache entry structure

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use termonaut_core::Avatar;

/// Metadata record stored as `meta/<fingerprint>.json`.
///
/// `expires_at` is fixed when the entry is created; reads never extend it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached avatar
    pub avatar: Avatar,

    /// When this entry was written
    pub cached_at: DateTime<Utc>,

    /// When this entry stops being served
    pub expires_at: DateTime<Utc>,

    /// Number of times this entry has been stored or read
    pub access_count: u64,

    /// Last time this entry was read
    pub last_access: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a fresh entry that lives for `ttl`
    pub fn new(avatar: Avatar, ttl: TimeDelta) -> Self {
        Self::created_at(avatar, ttl, Utc::now())
    }

    /// Create an entry as if it had been written at `now`
    pub fn created_at(avatar: Avatar, ttl: TimeDelta, now: DateTime<Utc>) -> Self {
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            avatar,
            cached_at: now,
            expires_at,
            access_count: 1,
            last_access: now,
        }
    }

    /// Whether the entry has passed its expiry time
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Update access metadata
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_access = Utc::now();
    }
}
