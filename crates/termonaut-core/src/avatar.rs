//! Avatar request and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::size::AvatarSize;

/// Appended to the style of avatars produced without the remote service.
pub const FALLBACK_SUFFIX: &str = "-fallback";

/// A request for an avatar. Built per call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequest {
    pub username: String,
    pub level: u32,
    pub style: String,
    pub size: AvatarSize,
}

impl AvatarRequest {
    pub fn new(
        username: impl Into<String>,
        level: u32,
        style: impl Into<String>,
        size: AvatarSize,
    ) -> Self {
        Self {
            username: username.into(),
            level,
            style: style.into(),
            size,
        }
    }

    /// First character of the username, `?` when empty.
    #[must_use]
    pub fn initial(&self) -> char {
        self.username.chars().next().unwrap_or('?')
    }
}

/// A generated avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub username: String,
    pub level: u32,
    pub style: String,
    pub size: AvatarSize,
    #[serde(with = "vector_text", default)]
    pub vector_bytes: Vec<u8>,
    #[serde(default)]
    pub ascii_art: String,
    pub seed: String,
    pub generated_at: DateTime<Utc>,
    pub fingerprint: String,
}

impl Avatar {
    /// Whether this avatar came from the offline generator.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.style.ends_with(FALLBACK_SUFFIX)
    }
}

/// SVG documents are text, so they are stored as a string in metadata
/// rather than as a byte array.
mod vector_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(text.into_bytes())
    }
}
