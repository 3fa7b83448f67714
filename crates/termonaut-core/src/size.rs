//! Avatar size tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dimensions for a generated avatar.
///
/// `vector_size` is the edge length of the square vector canvas in pixels;
/// `ascii_width` and `ascii_height` are the character-art dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvatarSize {
    pub vector_size: u32,
    pub ascii_width: u32,
    pub ascii_height: u32,
}

/// Error returned when parsing an unknown size name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid size '{0}', must be one of: mini, small, medium, large")]
pub struct ParseSizeError(pub String);

impl AvatarSize {
    pub const MINI: AvatarSize = AvatarSize::new(32, 10, 5);
    pub const SMALL: AvatarSize = AvatarSize::new(64, 20, 10);
    pub const MEDIUM: AvatarSize = AvatarSize::new(128, 40, 20);
    pub const LARGE: AvatarSize = AvatarSize::new(256, 60, 30);

    pub const fn new(vector_size: u32, ascii_width: u32, ascii_height: u32) -> Self {
        Self {
            vector_size,
            ascii_width,
            ascii_height,
        }
    }

    /// All three dimensions must be strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.vector_size > 0 && self.ascii_width > 0 && self.ascii_height > 0
    }

    /// Pick the largest avatar that fits comfortably in a terminal of the
    /// given dimensions.
    #[must_use]
    pub fn for_terminal(columns: u16, rows: u16) -> Self {
        match (columns, rows) {
            (c, r) if c >= 140 && r >= 35 => AvatarSize::new(256, 65, 32),
            (c, r) if c >= 120 && r >= 30 => AvatarSize::new(256, 60, 30),
            (c, r) if c >= 100 && r >= 25 => AvatarSize::new(128, 50, 25),
            (c, r) if c >= 80 && r >= 20 => AvatarSize::MEDIUM,
            (c, r) if c >= 60 && r >= 15 => AvatarSize::SMALL,
            (c, r) if c >= 40 && r >= 10 => AvatarSize::MINI,
            _ => AvatarSize::new(32, 8, 4),
        }
    }

    /// Name of the predefined tier, if this size matches one.
    #[must_use]
    pub fn tier_name(&self) -> Option<&'static str> {
        match *self {
            AvatarSize::MINI => Some("mini"),
            AvatarSize::SMALL => Some("small"),
            AvatarSize::MEDIUM => Some("medium"),
            AvatarSize::LARGE => Some("large"),
            _ => None,
        }
    }
}

impl Default for AvatarSize {
    fn default() -> Self {
        AvatarSize::SMALL
    }
}

impl FromStr for AvatarSize {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mini" => Ok(AvatarSize::MINI),
            "small" => Ok(AvatarSize::SMALL),
            "medium" => Ok(AvatarSize::MEDIUM),
            "large" => Ok(AvatarSize::LARGE),
            _ => Err(ParseSizeError(s.to_string())),
        }
    }
}

impl fmt::Display for AvatarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tier_name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}x{}", self.ascii_width, self.ascii_height),
        }
    }
}
