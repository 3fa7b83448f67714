//! Supported avatar styles.

use serde::{Deserialize, Serialize};

/// Style used when a request names nothing usable.
pub const DEFAULT_STYLE: &str = "pixel-art";

/// Every style the remote avatar service can render.
pub const SUPPORTED_STYLES: &[&str] = &[
    "pixel-art",
    "bottts",
    "adventurer",
    "avataaars",
    "big-ears",
    "big-smile",
    "croodles",
    "fun-emoji",
    "icons",
    "identicon",
    "initials",
    "lorelei",
    "micah",
    "miniavs",
    "notionists",
    "open-peeps",
    "personas",
    "rings",
    "shapes",
    "thumbs",
];

/// Human-facing description of a style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleInfo {
    pub name: String,
    pub description: String,
    pub recommended: bool,
    pub features: Vec<String>,
}

#[must_use]
pub fn is_style_supported(style: &str) -> bool {
    SUPPORTED_STYLES.contains(&style)
}

/// Describe a style. Unknown styles get a generic record.
#[must_use]
pub fn style_info(style: &str) -> StyleInfo {
    let (name, description, recommended, features): (&str, &str, bool, &[&str]) = match style {
        "pixel-art" => (
            "Pixel Art",
            "Retro 8-bit style avatars perfect for terminal display",
            true,
            &["accessories", "hair", "clothing"],
        ),
        "bottts" => (
            "Bottts",
            "Robot-themed avatars with clean geometric shapes",
            true,
            &["colors", "accessories", "antennas"],
        ),
        "adventurer" => (
            "Adventurer",
            "Fantasy character avatars with medieval themes",
            true,
            &["hair", "facial-hair", "accessories"],
        ),
        "avataaars" => (
            "Avataaars",
            "Modern cartoon-style avatars with many customization options",
            false,
            &["hair", "accessories", "clothing", "facial-hair"],
        ),
        other => (other, "Avatar style", false, &[]),
    };

    StyleInfo {
        name: name.to_string(),
        description: description.to_string(),
        recommended,
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}
