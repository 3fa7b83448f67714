use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use termonaut_core::AvatarSize;

#[derive(Parser, Debug)]
#[command(
    name = "termonaut",
    author,
    version,
    about,
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and manage level avatars
    Avatar {
        #[command(subcommand)]
        action: AvatarAction,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct AvatarTarget {
    /// Username to render; defaults to $USER
    #[arg(short, long)]
    pub user: Option<String>,

    /// Level to render at
    #[arg(short, long, default_value = "1")]
    pub level: u32,

    /// Avatar style; defaults to the configured style
    #[arg(short, long)]
    pub style: Option<String>,

    /// mini, small, medium, large or auto (fit the terminal)
    #[arg(long)]
    pub size: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AvatarAction {
    /// Show the avatar for a user
    Show {
        #[command(flatten)]
        target: AvatarTarget,

        /// Also print avatar details
        #[arg(long)]
        details: bool,
    },

    /// Preview the avatar at another level
    Preview {
        #[command(flatten)]
        target: AvatarTarget,
    },

    /// Regenerate the avatar, bypassing the cache
    Refresh {
        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long, default_value = "1")]
        level: u32,
    },

    /// List available styles
    Styles,

    /// Check that the avatar service is reachable
    Status,

    /// Show cache statistics
    Stats,

    /// Evict least recently used avatars until the cache fits a budget
    Evict {
        /// Budget in megabytes; defaults to the configured limit
        #[arg(long)]
        max_mb: Option<u64>,
    },

    /// Remove expired avatars now
    Sweep,

    /// Delete every cached avatar
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the effective configuration, or save new defaults
    Config {
        /// Default avatar style to save
        #[arg(long)]
        style: Option<String>,

        /// Default avatar size to save (mini, small, medium, large)
        #[arg(long)]
        size: Option<String>,
    },
}

/// Resolve the username, falling back to the login name.
pub fn resolve_username(user: Option<&str>) -> String {
    user.map(str::to_string)
        .filter(|name| !name.trim().is_empty())
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "user".to_string())
}

/// Parse a `--size` value; `auto` picks a size from the terminal dimensions.
pub fn resolve_size(size: Option<&str>, default: AvatarSize) -> Result<AvatarSize> {
    match size {
        None => Ok(default),
        Some(value) if value.eq_ignore_ascii_case("auto") => {
            let (columns, rows) = crate::cli::ui::terminal_dimensions();
            Ok(AvatarSize::for_terminal(columns, rows))
        }
        Some(value) => value.parse().map_err(|e| anyhow!("{}", e)),
    }
}

pub fn validate_level(level: u32) -> Result<()> {
    if level == 0 {
        return Err(anyhow!("Level must be at least 1"));
    }
    Ok(())
}
