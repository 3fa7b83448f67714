//! Cache management commands

use anyhow::{anyhow, Context, Result};
use std::io::{self, Write};

use termonaut_cache::AvatarCache;

use crate::cli::args::AvatarAction;
use crate::cli::ui::{format_bytes, StatusPrinter};
use crate::config::TermonautConfig;

/// Execute cache command
pub async fn handle_cache_command(action: &AvatarAction, config: &TermonautConfig) -> Result<()> {
    let printer = StatusPrinter::new();
    let cache_dir = config.avatar.resolved_cache_dir();
    // Opening the cache directly skips the background sweep.
    let cache = AvatarCache::new(&cache_dir, config.avatar.cache_ttl())
        .with_context(|| format!("Failed to open avatar cache at {}", cache_dir.display()))?;

    match action {
        AvatarAction::Stats => {
            let stats = cache.stats()?;

            printer.section("Avatar cache");
            printer.kv("Directory", &cache_dir.display().to_string());
            printer.kv("Entries", &stats.total_entries.to_string());
            printer.kv("Valid", &stats.valid_entries.to_string());
            printer.kv("Expired", &stats.expired_entries.to_string());
            printer.kv("Size", &format_bytes(stats.total_size));
            printer.kv("Accesses", &stats.total_access_count.to_string());
            printer.kv("Hit rate", &format!("{:.1}%", stats.hit_rate * 100.0));
            printer.kv("TTL", &format!("{} hours", config.avatar.cache_ttl_hours));

            if let Some(limit) = config.avatar.max_cache_bytes() {
                let usage = if limit == 0 {
                    100.0
                } else {
                    stats.total_size as f64 / limit as f64 * 100.0
                };
                printer.kv("Usage", &format!("{:.1}% of {}", usage, format_bytes(limit)));
                if usage > 90.0 {
                    printer.warning("Warning", "Cache is nearly full, consider `termonaut avatar evict`");
                }
            }

            if stats.expired_entries > 0 {
                printer.dim("Run `termonaut avatar sweep` to remove expired avatars");
            }
        }

        AvatarAction::Evict { max_mb } => {
            let max_bytes = max_mb
                .map(|mb| mb.saturating_mul(1024 * 1024))
                .or_else(|| config.avatar.max_cache_bytes())
                .ok_or_else(|| anyhow!("No size limit given and avatar.max_cache_size_mb is unset"))?;

            let stats = cache.evict_by_size(max_bytes)?;
            printer.success(
                "Evicted",
                &format!(
                    "{} avatars, freed {}",
                    stats.removed_count,
                    format_bytes(stats.freed_bytes)
                ),
            );
            printer.dim(&format!("Cache size now {}", format_bytes(cache.cache_size()?)));
        }

        AvatarAction::Sweep => {
            let stats = cache.spawn_sweep().join().await?;
            printer.success(
                "Swept",
                &format!(
                    "{} expired avatars, freed {}",
                    stats.removed_count,
                    format_bytes(stats.freed_bytes)
                ),
            );
        }

        AvatarAction::Clear { yes } => {
            let stats = cache.stats()?;
            printer.warning(
                "Warning",
                &format!(
                    "This will delete ALL {} cached avatars ({})",
                    stats.total_entries,
                    format_bytes(stats.total_size)
                ),
            );

            if !yes {
                eprint!("   Continue? [y/N]: ");
                io::stderr().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;

                if !input.trim().eq_ignore_ascii_case("y") {
                    printer.info("Aborted", "Cache left untouched");
                    return Ok(());
                }
            }

            cache.clear()?;
            printer.success("Cleared", &cache_dir.display().to_string());
        }

        other => return Err(anyhow!("Not a cache command: {:?}", other)),
    }

    Ok(())
}
