//! Cache cleanup and maintenance

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{CacheError, Result};
use crate::storage::CacheStorage;
use crate::AvatarCache;

/// Cleanup statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    /// Number of entries removed
    pub removed_count: usize,
    /// Bytes freed
    pub freed_bytes: u64,
}

impl CleanupStats {
    fn record(&mut self, size: u64) {
        self.removed_count += 1;
        self.freed_bytes += size;
    }

    fn merge(&mut self, other: CleanupStats) {
        self.removed_count += other.removed_count;
        self.freed_bytes += other.freed_bytes;
    }
}

/// Delete every entry whose expiry time is before `now`
///
/// Unreadable metadata is left alone; `get` reports it when asked.
pub(crate) fn sweep_expired(storage: &CacheStorage, now: DateTime<Utc>) -> CleanupStats {
    let mut stats = CleanupStats::default();

    for fingerprint in storage.fingerprints() {
        let Ok(entry) = storage.read_entry(&fingerprint) else {
            continue;
        };

        if !entry.is_expired_at(now) {
            continue;
        }

        let size = storage.entry_size(&fingerprint);
        match storage.delete(&fingerprint) {
            Ok(()) => {
                stats.record(size);
                log::debug!("Removed expired cache entry: {}", fingerprint);
            }
            Err(e) => log::warn!("Failed to remove expired cache entry {}: {}", fingerprint, e),
        }
    }

    stats
}

/// Evict least recently accessed entries until the cache fits in `max_bytes`
///
/// Entries with unreadable metadata sort as the oldest.
pub(crate) fn evict_by_size(storage: &CacheStorage, max_bytes: u64) -> Result<CleanupStats> {
    let mut stats = CleanupStats::default();

    let mut current_size = storage.total_size()?;
    if current_size <= max_bytes {
        return Ok(stats);
    }

    let mut entries: Vec<(String, DateTime<Utc>, u64)> = storage
        .fingerprints()
        .into_iter()
        .map(|fingerprint| {
            let last_access = storage
                .read_entry(&fingerprint)
                .map(|entry| entry.last_access)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let size = storage.entry_size(&fingerprint);
            (fingerprint, last_access, size)
        })
        .collect();

    // Oldest access first
    entries.sort_by_key(|(_, last_access, _)| *last_access);

    for (fingerprint, _, size) in entries {
        if current_size <= max_bytes {
            break;
        }

        match storage.delete(&fingerprint) {
            Ok(()) => {
                current_size = current_size.saturating_sub(size);
                stats.record(size);
                log::debug!("Evicted LRU cache entry: {}", fingerprint);
            }
            Err(e) => log::warn!("Failed to evict cache entry {}: {}", fingerprint, e),
        }
    }

    Ok(stats)
}

/// Handle to a background expiry sweep
///
/// Dropping the handle cancels a periodic sweep. A one-shot sweep that has
/// already started walking the cache runs to completion.
pub struct SweepTask {
    handle: Option<JoinHandle<Result<CleanupStats>>>,
    cancel: CancellationToken,
}

impl SweepTask {
    /// Run a single sweep on the blocking pool. Requires a tokio runtime.
    pub fn once(cache: AvatarCache) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            if token.is_cancelled() {
                return Ok(CleanupStats::default());
            }
            Ok(cache.sweep_expired())
        });

        Self {
            handle: Some(handle),
            cancel,
        }
    }

    /// Sweep immediately and then every `interval` until cancelled.
    /// Requires a tokio runtime.
    pub fn periodic(cache: AvatarCache, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut total = CleanupStats::default();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let cache = cache.clone();
                        let stats = tokio::task::spawn_blocking(move || cache.sweep_expired())
                            .await
                            .map_err(|e| CacheError::Task(e.to_string()))?;
                        if stats.removed_count > 0 {
                            log::info!("Expiry sweep removed {} entries", stats.removed_count);
                        }
                        total.merge(stats);
                    }
                }
            }

            Ok(total)
        });

        Self {
            handle: Some(handle),
            cancel,
        }
    }

    /// Ask the task to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| handle.is_finished())
    }

    /// Wait for the task and return what it removed
    ///
    /// A periodic sweep only finishes after `cancel`.
    pub async fn join(mut self) -> Result<CleanupStats> {
        match self.handle.take() {
            Some(handle) => handle.await.map_err(|e| CacheError::Task(e.to_string()))?,
            None => Ok(CleanupStats::default()),
        }
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
