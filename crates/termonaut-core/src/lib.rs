//! Core types for the Termonaut avatar system.
//!
//! This crate provides the plain data model shared by the cache and the
//! generator:
//! - Avatar requests and generated avatars
//! - Avatar size tiers
//! - The supported style catalogue
//! - Level progression helpers

mod avatar;
mod level;
mod size;
mod style;

pub use avatar::{Avatar, AvatarRequest, FALLBACK_SUFFIX};
pub use level::{level_tier, next_evolution_level, EVOLUTION_LEVELS};
pub use size::{AvatarSize, ParseSizeError};
pub use style::{is_style_supported, style_info, StyleInfo, DEFAULT_STYLE, SUPPORTED_STYLES};
