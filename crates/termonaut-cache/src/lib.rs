//! Termonaut avatar cache
//!
//! A directory-backed store mapping a fingerprint to a metadata record plus
//! the vector and character-art artifacts of a generated avatar. Entries
//! expire a fixed time after they are written and can be evicted least
//! recently used first to keep the directory under a size budget.
//!
//! The cache assumes a single owning process; eviction is not coordinated
//! with concurrent `set`/`get` calls on the same entries.

pub mod cleanup;
pub mod entry;
pub mod error;
pub mod key;
pub mod storage;

pub use cleanup::{CleanupStats, SweepTask};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use key::{FingerprintGenerator, FINGERPRINT_VERSION};
pub use storage::CacheStorage;

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use termonaut_core::Avatar;

/// Main cache interface
#[derive(Debug, Clone)]
pub struct AvatarCache {
    storage: CacheStorage,
    ttl: TimeDelta,
}

impl AvatarCache {
    /// Open (and create if needed) a cache rooted at `cache_dir`
    ///
    /// No sweep is started here; use [`AvatarCache::spawn_sweep`] or
    /// [`SweepTask::periodic`] to schedule one.
    pub fn new<P: AsRef<Path>>(cache_dir: P, ttl: Duration) -> Result<Self> {
        let storage = CacheStorage::new(cache_dir)?;
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);

        Ok(Self { storage, ttl })
    }

    /// Get a cached avatar and record the access
    ///
    /// Expired entries are deleted and reported as [`CacheError::Expired`].
    /// The artifacts on disk take precedence over the copies in metadata;
    /// missing artifact files are tolerated.
    pub fn get(&self, fingerprint: &str) -> Result<Avatar> {
        let mut entry = self.storage.read_entry(fingerprint)?;

        if entry.is_expired() {
            if let Err(e) = self.storage.delete(fingerprint) {
                log::warn!("Failed to remove expired cache entry {}: {}", fingerprint, e);
            }
            log::debug!("Cache expired: {}", fingerprint);
            return Err(CacheError::Expired(fingerprint.to_string()));
        }

        entry.record_access();
        if let Err(e) = self.storage.write_entry(fingerprint, &entry) {
            log::warn!("Failed to update cache access metadata for {}: {}", fingerprint, e);
        }

        let mut avatar = entry.avatar;
        if let Some(vector) = self.storage.read_vector(fingerprint) {
            avatar.vector_bytes = vector;
        }
        if let Some(ascii) = self.storage.read_ascii(fingerprint) {
            avatar.ascii_art = ascii;
        }

        log::debug!("Cache hit: {}", fingerprint);
        Ok(avatar)
    }

    /// Read an entry's metadata without touching its access statistics
    pub fn peek(&self, fingerprint: &str) -> Result<CacheEntry> {
        self.storage.read_entry(fingerprint)
    }

    /// Store an avatar with a fresh TTL
    pub fn set(&self, fingerprint: &str, avatar: &Avatar) -> Result<()> {
        let entry = CacheEntry::new(avatar.clone(), self.ttl);

        self.storage
            .commit(fingerprint, &entry, &avatar.vector_bytes, &avatar.ascii_art)?;
        log::debug!("Cache stored: {}", fingerprint);

        Ok(())
    }

    /// Remove an entry; removing a missing entry is not an error
    pub fn delete(&self, fingerprint: &str) -> Result<()> {
        self.storage.delete(fingerprint)
    }

    /// Remove the entire cache directory
    pub fn clear(&self) -> Result<()> {
        self.storage.clear()
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now();
        let mut stats = CacheStats::default();

        for fingerprint in self.storage.fingerprints() {
            stats.total_entries += 1;

            let Ok(entry) = self.storage.read_entry(&fingerprint) else {
                continue;
            };

            if entry.is_expired_at(now) {
                stats.expired_entries += 1;
            } else {
                stats.valid_entries += 1;
            }

            stats.total_access_count += entry.access_count;
            stats.total_size += self.storage.entry_size(&fingerprint);
        }

        // Rough proxy only: hits are not tracked separately.
        if stats.total_access_count > 0 {
            stats.hit_rate = stats.valid_entries as f64 / stats.total_access_count as f64;
        }

        Ok(stats)
    }

    /// Total size of the cache directory in bytes
    pub fn cache_size(&self) -> Result<u64> {
        self.storage.total_size()
    }

    /// Delete every expired entry now
    pub fn sweep_expired(&self) -> CleanupStats {
        cleanup::sweep_expired(&self.storage, Utc::now())
    }

    /// Evict least recently accessed entries until the cache fits in `max_bytes`
    pub fn evict_by_size(&self, max_bytes: u64) -> Result<CleanupStats> {
        cleanup::evict_by_size(&self.storage, max_bytes)
    }

    /// Start a one-shot expiry sweep in the background
    pub fn spawn_sweep(&self) -> SweepTask {
        SweepTask::once(self.clone())
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        self.storage.cache_dir()
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size: u64,
    pub total_access_count: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use termonaut_core::AvatarSize;

    fn avatar(fingerprint: &str) -> Avatar {
        Avatar {
            username: "alice".to_string(),
            level: 7,
            style: "pixel-art".to_string(),
            size: AvatarSize::SMALL,
            vector_bytes: b"<svg width=\"64\"></svg>".to_vec(),
            ascii_art: "@@\n##".to_string(),
            seed: "alice:7:1".to_string(),
            generated_at: Utc::now(),
            fingerprint: fingerprint.to_string(),
        }
    }

    fn cache(temp_dir: &TempDir) -> AvatarCache {
        AvatarCache::new(temp_dir.path(), Duration::from_secs(7 * 24 * 3600)).unwrap()
    }

    #[test]
    fn test_cache_get_set() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);

        assert!(matches!(cache.get("abc"), Err(CacheError::NotFound(_))));

        cache.set("abc", &avatar("abc")).unwrap();

        let hit = cache.get("abc").unwrap();
        assert_eq!(hit, avatar_with_time(&hit));
        assert_eq!(cache.peek("abc").unwrap().access_count, 2);
    }

    fn avatar_with_time(hit: &Avatar) -> Avatar {
        Avatar {
            generated_at: hit.generated_at,
            ..avatar("abc")
        }
    }

    #[test]
    fn test_get_hydrates_from_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);
        cache.set("abc", &avatar("abc")).unwrap();

        std::fs::write(cache.storage().ascii_path("abc"), "updated").unwrap();
        std::fs::remove_file(cache.storage().vector_path("abc")).unwrap();

        let hit = cache.get("abc").unwrap();
        assert_eq!(hit.ascii_art, "updated");
        // Falls back to the metadata copy when the artifact is gone
        assert_eq!(hit.vector_bytes, avatar("abc").vector_bytes);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);

        let entry = CacheEntry::created_at(
            avatar("old"),
            TimeDelta::hours(1),
            Utc::now() - TimeDelta::hours(2),
        );
        cache
            .storage()
            .commit("old", &entry, b"<svg/>", "art")
            .unwrap();

        assert!(matches!(cache.get("old"), Err(CacheError::Expired(_))));
        assert!(!cache.storage().meta_path("old").exists());
        assert!(!cache.storage().vector_path("old").exists());
        assert!(!cache.storage().ascii_path("old").exists());
        assert!(matches!(cache.get("old"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_access_does_not_extend_expiry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);
        cache.set("abc", &avatar("abc")).unwrap();

        let before = cache.peek("abc").unwrap();
        cache.get("abc").unwrap();
        let after = cache.peek("abc").unwrap();

        assert_eq!(before.expires_at, after.expires_at);
        assert_eq!(before.cached_at, after.cached_at);
        assert!(after.last_access >= before.last_access);
    }

    #[test]
    fn test_cache_stats() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);

        cache.set("one", &avatar("one")).unwrap();
        cache.set("two", &avatar("two")).unwrap();
        cache.get("one").unwrap();

        let expired = CacheEntry::created_at(
            avatar("old"),
            TimeDelta::hours(1),
            Utc::now() - TimeDelta::hours(2),
        );
        cache.storage().commit("old", &expired, b"", "").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.total_access_count, 4);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        assert!(stats.total_size > 0);
    }

    #[test]
    fn test_cache_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);

        cache.set("one", &avatar("one")).unwrap();
        cache.clear().unwrap();

        assert!(!cache.cache_dir().exists());
        assert_eq!(cache.stats().unwrap().total_entries, 0);

        // The layout is recreated on the next write
        cache.set("one", &avatar("one")).unwrap();
        assert!(cache.get("one").is_ok());
    }

    #[test]
    fn test_evict_to_zero() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache(&temp_dir);

        cache.set("one", &avatar("one")).unwrap();
        cache.set("two", &avatar("two")).unwrap();

        let stats = cache.evict_by_size(0).unwrap();
        assert_eq!(stats.removed_count, 2);
        assert_eq!(cache.cache_size().unwrap(), 0);
    }
}
