use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use termonaut::avatar::{
    ArtConverter, AvatarError, AvatarManager, RemoteParams, TransportKind, VectorSource,
};
use termonaut::{AvatarCache, AvatarRequest, AvatarSize};

/// What the scripted source answers with
#[derive(Clone)]
enum Script {
    Svg,
    Fail(AvatarError),
}

struct ScriptedSource {
    script: Script,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorSource for ScriptedSource {
    fn build_url(&self, style: &str, params: &RemoteParams) -> Result<String, AvatarError> {
        Ok(format!("http://avatars.test/{}/svg?seed={}", style, params.seed))
    }

    async fn fetch_vector(
        &self,
        _style: &str,
        params: &RemoteParams,
    ) -> Result<Vec<u8>, AvatarError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Svg => Ok(format!(
                "<svg width=\"{0}\" height=\"{0}\"><rect/></svg>",
                params.size
            )
            .into_bytes()),
            Script::Fail(err) => Err(err.clone()),
        }
    }
}

/// Renders a block of `#` the requested size, or fails.
struct BlockArt {
    fail: bool,
}

#[async_trait]
impl ArtConverter for BlockArt {
    async fn convert(&self, _vector_url: &str, size: &AvatarSize) -> Result<String, AvatarError> {
        if self.fail {
            return Err(AvatarError::EmptyResult);
        }
        let line = "#".repeat(size.ascii_width as usize);
        Ok(vec![line; size.ascii_height as usize].join("\n"))
    }
}

fn manager(temp_dir: &TempDir, source: Arc<ScriptedSource>, fail_art: bool) -> AvatarManager {
    let cache = AvatarCache::new(temp_dir.path(), Duration::from_secs(7 * 24 * 3600)).unwrap();
    AvatarManager::with_components(cache, source, Arc::new(BlockArt { fail: fail_art }))
}

fn alice() -> AvatarRequest {
    AvatarRequest::new("alice", 7, "pixel-art", AvatarSize::SMALL)
}

#[tokio::test]
async fn test_generate_alice_scenario() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = ScriptedSource::new(Script::Svg);
    let manager = manager(&temp_dir, source.clone(), false);

    let avatar = manager.generate(alice()).await?;

    assert!(!avatar.is_fallback());
    assert_eq!(avatar.style, "pixel-art");
    assert_eq!(avatar.seed, "alice:7:1");
    assert!(!avatar.vector_bytes.is_empty());

    let lines: Vec<&str> = avatar.ascii_art.lines().collect();
    assert_eq!(lines.len(), 10);
    assert!(lines.iter().all(|line| line.chars().count() <= 20));

    // A second identical request is served from cache
    let again = manager.generate(alice()).await?;
    assert_eq!(again.ascii_art, avatar.ascii_art);
    assert_eq!(again.vector_bytes, avatar.vector_bytes);
    assert_eq!(source.fetches(), 1);

    Ok(())
}

#[tokio::test]
async fn test_cache_hit_increments_access_count() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = ScriptedSource::new(Script::Svg);
    let manager = manager(&temp_dir, source.clone(), false);

    let first = manager.generate(alice()).await?;
    let after_first = manager.cache().peek(&first.fingerprint)?.access_count;

    manager.generate(alice()).await?;
    let after_second = manager.cache().peek(&first.fingerprint)?.access_count;

    assert_eq!(source.fetches(), 1);
    assert_eq!(after_second, after_first + 1);

    Ok(())
}

#[tokio::test]
async fn test_network_failure_falls_back_and_is_cached() -> anyhow::Result<()> {
    for kind in [TransportKind::Dns, TransportKind::ConnectionRefused] {
        let temp_dir = TempDir::new()?;
        let source = ScriptedSource::new(Script::Fail(AvatarError::transport(
            kind,
            "simulated outage",
        )));
        let manager = manager(&temp_dir, source.clone(), false);

        let avatar = manager.generate(alice()).await?;
        assert!(avatar.style.ends_with("-fallback"));
        assert!(!avatar.ascii_art.is_empty());
        assert!(String::from_utf8(avatar.vector_bytes.clone())?.contains("<svg"));

        let cached = manager
            .get_cached(&avatar.fingerprint)
            .expect("fallback avatar should be cached");
        assert_eq!(cached.style, avatar.style);

        manager.generate(alice()).await?;
        assert_eq!(source.fetches(), 1);
    }

    Ok(())
}

#[tokio::test]
async fn test_non_network_failure_is_returned_and_not_cached() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let upstream = AvatarError::Upstream {
        status: 500,
        message: "Internal Server Error".to_string(),
    };
    let source = ScriptedSource::new(Script::Fail(upstream.clone()));
    let manager = manager(&temp_dir, source.clone(), false);

    let err = manager.generate(alice()).await.unwrap_err();
    assert_eq!(err, upstream);

    let fingerprint = manager.fingerprint(alice())?;
    assert!(manager.get_cached(&fingerprint).is_none());

    // Nothing was cached, so the next call tries again
    assert!(manager.generate(alice()).await.is_err());
    assert_eq!(source.fetches(), 2);

    Ok(())
}

#[tokio::test]
async fn test_conversion_failure_keeps_remote_vector() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = ScriptedSource::new(Script::Svg);
    let manager = manager(&temp_dir, source, true);

    let avatar = manager.generate(alice()).await?;

    assert!(!avatar.is_fallback());
    assert!(String::from_utf8(avatar.vector_bytes.clone())?.contains("<rect/>"));
    assert!(avatar.ascii_art.contains("a Lv7"));

    Ok(())
}

#[tokio::test]
async fn test_same_request_same_seed_and_fingerprint() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let manager = manager(&temp_dir, ScriptedSource::new(Script::Svg), false);

    let a = manager.fingerprint(alice())?;
    let b = manager.fingerprint(AvatarRequest::new(
        "alice",
        7,
        "pixel-art",
        AvatarSize::new(512, 20, 10),
    ))?;
    assert_eq!(a, b);

    let other_level = manager.fingerprint(AvatarRequest::new("alice", 8, "pixel-art", AvatarSize::SMALL))?;
    assert_ne!(a, other_level);

    Ok(())
}

#[tokio::test]
async fn test_evict_to_zero_empties_cache() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let manager = manager(&temp_dir, ScriptedSource::new(Script::Svg), false);

    manager.generate(alice()).await?;
    manager
        .generate(AvatarRequest::new("bob", 12, "bottts", AvatarSize::MEDIUM))
        .await?;
    assert!(manager.cache_size()? > 0);

    let stats = manager.evict_by_size(0)?;

    assert_eq!(stats.removed_count, 2);
    assert_eq!(manager.cache_size()?, 0);
    assert_eq!(manager.cache_stats()?.total_entries, 0);

    Ok(())
}

#[tokio::test]
async fn test_refresh_bypasses_cache() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = ScriptedSource::new(Script::Svg);
    let manager = manager(&temp_dir, source.clone(), false)
        .with_level_provider(Arc::new(termonaut::avatar::FixedLevel(7)));

    manager.generate(alice()).await?;
    let refreshed = manager.refresh("alice").await?;

    assert_eq!(refreshed.level, 7);
    assert_eq!(source.fetches(), 2);
    assert_eq!(manager.cache().peek(&refreshed.fingerprint)?.access_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_network_status() -> anyhow::Result<()> {
    use termonaut::avatar::NetworkStatus;

    let temp_dir = TempDir::new()?;
    let online = manager(&temp_dir, ScriptedSource::new(Script::Svg), false);
    assert_eq!(online.network_status().await, NetworkStatus::Online);

    let offline = manager(
        &temp_dir,
        ScriptedSource::new(Script::Fail(AvatarError::transport(
            TransportKind::Timeout,
            "timed out",
        ))),
        false,
    );
    assert!(matches!(offline.network_status().await, NetworkStatus::Offline(_)));

    let broken = manager(
        &temp_dir,
        ScriptedSource::new(Script::Fail(AvatarError::Format("not svg".into()))),
        false,
    );
    assert!(matches!(broken.network_status().await, NetworkStatus::ServiceError(_)));

    Ok(())
}

#[test]
fn test_sweep_runs_inline_without_runtime() -> anyhow::Result<()> {
    use chrono::{TimeDelta, Utc};
    use termonaut::Avatar;
    use termonaut_cache::CacheEntry;

    let temp_dir = TempDir::new()?;
    let mut manager = manager(&temp_dir, ScriptedSource::new(Script::Svg), false);

    let stale = Avatar {
        username: "old".to_string(),
        level: 1,
        style: "pixel-art".to_string(),
        size: AvatarSize::SMALL,
        vector_bytes: b"<svg/>".to_vec(),
        ascii_art: "#".to_string(),
        seed: "old:1:0".to_string(),
        generated_at: Utc::now() - TimeDelta::hours(3),
        fingerprint: "stale".to_string(),
    };
    let entry = CacheEntry::created_at(stale, TimeDelta::hours(1), Utc::now() - TimeDelta::hours(2));
    manager.cache().storage().commit("stale", &entry, b"<svg/>", "#")?;

    manager.start_sweep(None);
    assert!(manager.cache().peek("stale").is_err());

    // The manager still works once a runtime is available
    let avatar = tokio_test::block_on(manager.generate(alice()))?;
    assert!(!avatar.is_fallback());

    Ok(())
}
