//! Avatar manager
//!
//! Ties the pieces together: request validation, cache lookups,
//! single-flight builds, the remote source with offline fallback, character
//! art conversion and the background expiry sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use termonaut_cache::{AvatarCache, CacheStats, CleanupStats, SweepTask};
use termonaut_core::{Avatar, AvatarRequest, AvatarSize, DEFAULT_STYLE};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::convert::{ArtConverter, RasterPipeline};
use super::error::AvatarError;
use super::fallback;
use super::policy::{self, RemoteParams};
use super::remote::{DiceBearClient, VectorSource};
use crate::config::AvatarConfig;

/// Source of a user's current level.
pub trait LevelProvider: Send + Sync {
    fn current_level(&self, username: &str) -> u32;
}

/// Reports the same level for every user.
#[derive(Debug, Clone, Copy)]
pub struct FixedLevel(pub u32);

impl Default for FixedLevel {
    fn default() -> Self {
        FixedLevel(1)
    }
}

impl LevelProvider for FixedLevel {
    fn current_level(&self, _username: &str) -> u32 {
        self.0
    }
}

/// Reachability of the avatar service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    /// The service could not be reached at all.
    Offline(AvatarError),
    /// The service answered, but not with an avatar.
    ServiceError(AvatarError),
}

type Flight = Arc<OnceCell<Result<Avatar, AvatarError>>>;

pub struct AvatarManager {
    source: Arc<dyn VectorSource>,
    converter: Arc<dyn ArtConverter>,
    cache: AvatarCache,
    levels: Arc<dyn LevelProvider>,
    default_style: String,
    default_size: AvatarSize,
    in_flight: Mutex<HashMap<String, Flight>>,
    sweep: Option<SweepTask>,
}

impl AvatarManager {
    /// Build a manager from configuration and start the expiry sweep.
    pub fn new(config: &AvatarConfig) -> Result<Self, AvatarError> {
        let cache = AvatarCache::new(config.resolved_cache_dir(), config.cache_ttl())?;
        let source = DiceBearClient::new(&config.api_base_url, config.api_timeout())?;
        let converter =
            RasterPipeline::new(config.api_timeout())?.with_max_bytes(config.max_raster_bytes);
        let default_size = config
            .default_size()
            .map_err(|e| AvatarError::Validation(e.to_string()))?;

        let mut manager = Self::with_components(cache, Arc::new(source), Arc::new(converter))
            .with_defaults(config.default_style.clone(), default_size);
        manager.start_sweep(config.sweep_interval());

        Ok(manager)
    }

    /// Build a manager over explicit collaborators. No sweep is started.
    pub fn with_components(
        cache: AvatarCache,
        source: Arc<dyn VectorSource>,
        converter: Arc<dyn ArtConverter>,
    ) -> Self {
        Self {
            source,
            converter,
            cache,
            levels: Arc::new(FixedLevel::default()),
            default_style: DEFAULT_STYLE.to_string(),
            default_size: AvatarSize::default(),
            in_flight: Mutex::new(HashMap::new()),
            sweep: None,
        }
    }

    pub fn with_level_provider(mut self, levels: Arc<dyn LevelProvider>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_defaults(mut self, style: impl Into<String>, size: AvatarSize) -> Self {
        self.default_style = style.into();
        self.default_size = size;
        self
    }

    /// Run the expiry sweep in the background, once or every `interval`.
    ///
    /// Without a tokio runtime the sweep runs inline instead.
    pub fn start_sweep(&mut self, interval: Option<Duration>) {
        if tokio::runtime::Handle::try_current().is_err() {
            let stats = self.cache.sweep_expired();
            debug!("Inline expiry sweep removed {} entries", stats.removed_count);
            return;
        }

        let task = match interval {
            Some(interval) => SweepTask::periodic(self.cache.clone(), interval),
            None => SweepTask::once(self.cache.clone()),
        };
        // Replacing an earlier task drops and cancels it.
        self.sweep = Some(task);
    }

    /// Stop the background sweep and wait for it.
    pub async fn shutdown(&mut self) -> Result<CleanupStats, AvatarError> {
        match self.sweep.take() {
            Some(task) => {
                task.cancel();
                Ok(task.join().await?)
            }
            None => Ok(CleanupStats::default()),
        }
    }

    /// Produce the avatar for `request`, from cache when possible.
    ///
    /// Network failures yield a fallback avatar rather than an error.
    /// Concurrent calls for the same avatar share a single build.
    pub async fn generate(&self, request: AvatarRequest) -> Result<Avatar, AvatarError> {
        let request = self.normalize(request)?;
        let fingerprint = policy::derive_fingerprint(&request);

        if let Some(avatar) = self.lookup(&fingerprint) {
            return Ok(avatar);
        }

        let flight = self.join_flight(&fingerprint);
        let result = flight
            .get_or_init(|| self.build(&request, &fingerprint))
            .await
            .clone();
        self.leave_flight(&fingerprint, &flight);

        result
    }

    /// Drop the cached avatar for `username` at their current level and
    /// generate it again with the default style and size.
    pub async fn refresh(&self, username: &str) -> Result<Avatar, AvatarError> {
        let level = self.levels.current_level(username);
        let request = self.normalize(AvatarRequest::new(
            username,
            level,
            self.default_style.clone(),
            self.default_size,
        ))?;
        let fingerprint = policy::derive_fingerprint(&request);

        if let Err(e) = self.cache.delete(&fingerprint) {
            warn!("Failed to drop cached avatar {}: {}", fingerprint, e);
        }

        self.generate(request).await
    }

    /// Cached avatar for a fingerprint, without ever generating one.
    pub fn get_cached(&self, fingerprint: &str) -> Option<Avatar> {
        self.lookup(fingerprint)
    }

    /// Fingerprint `generate` would use for `request`.
    pub fn fingerprint(&self, request: AvatarRequest) -> Result<String, AvatarError> {
        let request = self.normalize(request)?;
        Ok(policy::derive_fingerprint(&request))
    }

    /// Fetch a tiny avatar to check the service is usable.
    pub async fn test_connection(&self) -> Result<(), AvatarError> {
        self.source
            .fetch_vector(DEFAULT_STYLE, &RemoteParams::with_seed("test", 32))
            .await
            .map(|_| ())
    }

    pub async fn network_status(&self) -> NetworkStatus {
        match self.test_connection().await {
            Ok(()) => NetworkStatus::Online,
            Err(e) if e.is_network() => NetworkStatus::Offline(e),
            Err(e) => NetworkStatus::ServiceError(e),
        }
    }

    pub fn cache_stats(&self) -> Result<CacheStats, AvatarError> {
        Ok(self.cache.stats()?)
    }

    pub fn cache_size(&self) -> Result<u64, AvatarError> {
        Ok(self.cache.cache_size()?)
    }

    pub fn clear_cache(&self) -> Result<(), AvatarError> {
        Ok(self.cache.clear()?)
    }

    pub fn sweep_expired(&self) -> CleanupStats {
        self.cache.sweep_expired()
    }

    pub fn evict_by_size(&self, max_bytes: u64) -> Result<CleanupStats, AvatarError> {
        Ok(self.cache.evict_by_size(max_bytes)?)
    }

    pub fn supported_styles(&self) -> &[&'static str] {
        self.source.supported_styles()
    }

    pub fn cache(&self) -> &AvatarCache {
        &self.cache
    }

    pub fn default_style(&self) -> &str {
        &self.default_style
    }

    pub fn default_size(&self) -> AvatarSize {
        self.default_size
    }

    /// Validate a request and fill in the style.
    fn normalize(&self, mut request: AvatarRequest) -> Result<AvatarRequest, AvatarError> {
        if request.username.trim().is_empty() {
            return Err(AvatarError::Validation("username is empty".to_string()));
        }
        if request.level == 0 {
            return Err(AvatarError::Validation("level must be at least 1".to_string()));
        }
        if !request.size.is_valid() {
            return Err(AvatarError::Validation(format!(
                "invalid size {}",
                request.size
            )));
        }

        if request.style.is_empty() {
            request.style = self.default_style.clone();
        } else if !self.source.is_style_supported(&request.style) {
            debug!(
                "Unsupported style {:?}, using {}",
                request.style, self.default_style
            );
            request.style = self.default_style.clone();
        }

        Ok(request)
    }

    fn lookup(&self, fingerprint: &str) -> Option<Avatar> {
        match self.cache.get(fingerprint) {
            Ok(avatar) => Some(avatar),
            Err(e) if e.is_miss() => {
                debug!("Avatar cache miss: {}", fingerprint);
                None
            }
            Err(e) => {
                warn!("Avatar cache read failed for {}: {}", fingerprint, e);
                None
            }
        }
    }

    fn join_flight(&self, fingerprint: &str) -> Flight {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight
            .entry(fingerprint.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn leave_flight(&self, fingerprint: &str, flight: &Flight) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(fingerprint)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            in_flight.remove(fingerprint);
        }
    }

    async fn build(&self, request: &AvatarRequest, fingerprint: &str) -> Result<Avatar, AvatarError> {
        // Another flight may have finished between the first lookup and now.
        if let Some(avatar) = self.lookup(fingerprint) {
            return Ok(avatar);
        }

        let seed = policy::derive_seed(request);
        let params = policy::derive_params(request, &seed);

        let avatar = match self.fetch(request, &params).await {
            Ok((vector_url, vector_bytes)) => {
                let ascii_art = match self.converter.convert(&vector_url, &request.size).await {
                    Ok(art) => art,
                    Err(e) => {
                        warn!("Character art conversion failed, using fallback art: {}", e);
                        fallback::character_art(request)
                    }
                };

                Avatar {
                    username: request.username.clone(),
                    level: request.level,
                    style: request.style.clone(),
                    size: request.size,
                    vector_bytes,
                    ascii_art,
                    seed,
                    generated_at: chrono::Utc::now(),
                    fingerprint: fingerprint.to_string(),
                }
            }
            Err(e) if e.is_network() => {
                warn!("Avatar service unreachable, generating offline avatar: {}", e);
                fallback::synthesize(request, &seed, fingerprint)
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.cache.set(fingerprint, &avatar) {
            warn!("Failed to cache avatar {}: {}", fingerprint, e);
        } else {
            info!(
                "Generated avatar for {} at level {} ({})",
                avatar.username, avatar.level, avatar.style
            );
        }

        Ok(avatar)
    }

    async fn fetch(
        &self,
        request: &AvatarRequest,
        params: &RemoteParams,
    ) -> Result<(String, Vec<u8>), AvatarError> {
        let vector_url = self.source.build_url(&request.style, params)?;
        let vector_bytes = self.source.fetch_vector(&request.style, params).await?;
        Ok((vector_url, vector_bytes))
    }
}
