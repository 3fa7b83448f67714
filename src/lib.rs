pub mod avatar;
pub mod cli;
pub mod config;

// Re-export core types for convenience
pub use termonaut_cache::{AvatarCache, CacheStats, CleanupStats};
pub use termonaut_core::{Avatar, AvatarRequest, AvatarSize};
