//! Seed, fingerprint and level-tier parameter derivation.
//!
//! Everything here is pure: the same request always yields the same seed,
//! fingerprint and remote parameters.

use termonaut_cache::FingerprintGenerator;
use termonaut_core::{level_tier, AvatarRequest};

/// Optional parameters sent to the avatar service alongside the seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteParams {
    pub seed: String,
    pub size: u32,
    pub hair_color: Vec<String>,
    pub background_type: Vec<String>,
    pub background_rotation: Vec<u32>,
    pub accessories: Vec<String>,
    pub accessories_color: Vec<String>,
    pub flip: bool,
    pub rotate: u32,
    pub scale: u32,
    pub radius: u32,
    pub translate_x: u32,
    pub translate_y: u32,
}

impl RemoteParams {
    pub fn with_seed(seed: impl Into<String>, size: u32) -> Self {
        Self {
            seed: seed.into(),
            size,
            ..Self::default()
        }
    }
}

/// `username:level:tier`, where the tier only moves every five levels.
pub fn derive_seed(request: &AvatarRequest) -> String {
    format!(
        "{}:{}:{}",
        request.username,
        request.level,
        level_tier(request.level)
    )
}

/// Cache key over identity, style and character-art dimensions.
pub fn derive_fingerprint(request: &AvatarRequest) -> String {
    FingerprintGenerator::new().fingerprint(
        &request.username,
        request.level,
        &request.style,
        request.size.ascii_width,
        request.size.ascii_height,
    )
}

/// Sum of the username's character codes.
pub fn username_hash(username: &str) -> u32 {
    username
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_add(c as u32))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Build remote parameters for a request, richer as the level grows.
pub fn derive_params(request: &AvatarRequest, seed: &str) -> RemoteParams {
    let mut params = RemoteParams::with_seed(seed, request.size.vector_size);
    let level = request.level;
    let pixel_art = request.style == "pixel-art";

    match level {
        100.. => {
            params.hair_color = strings(&["ff6b6b", "4ecdc4", "45b7d1", "f39c12", "9b59b6", "e74c3c"]);
            params.background_type = strings(&["gradientLinear", "gradientRadial"]);
            params.background_rotation = vec![45, 90, 135, 180];
            if pixel_art {
                params.accessories = strings(&["glasses", "hat"]);
                params.accessories_color = strings(&["ff6b6b", "4ecdc4", "45b7d1"]);
            }
            params.flip = level % 7 == 0;
        }
        50..=99 => {
            params.hair_color = strings(&["724133", "f59797", "65c9ff", "92d5ea", "fbbf24", "e67e22"]);
            params.background_type = strings(&["gradientLinear"]);
            params.background_rotation = vec![0, 45, 90];
            if pixel_art {
                params.accessories = strings(&["glasses"]);
                params.accessories_color = strings(&["333333", "666666", "999999"]);
            }
            params.scale = 100 + (level - 50) * 2;
        }
        20..=49 => {
            params.hair_color = strings(&["724133", "f59797", "65c9ff", "92d5ea", "fbbf24"]);
            params.background_type = strings(&["solid"]);
            if pixel_art {
                params.accessories = strings(&["glasses"]);
            }
            params.rotate = (level - 20) * 2;
        }
        10..=19 => {
            params.hair_color = strings(&["724133", "f59797", "65c9ff", "92d5ea"]);
            params.translate_x = (level - 10) % 5;
            params.translate_y = (level - 10) % 3;
        }
        5..=9 => {
            params.hair_color = strings(&["724133", "f59797", "65c9ff"]);
            if pixel_art && level >= 7 {
                params.accessories = strings(&["glasses"]);
            }
        }
        _ => {}
    }

    let hash = username_hash(&request.username);

    if !params.hair_color.is_empty() {
        let index = hash as usize % params.hair_color.len();
        params.hair_color = vec![params.hair_color[index].clone()];
    }

    if level >= 10 {
        params.radius = 10 + hash % 20;
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use termonaut_core::AvatarSize;

    fn request(username: &str, level: u32, style: &str) -> AvatarRequest {
        AvatarRequest::new(username, level, style, AvatarSize::SMALL)
    }

    #[test]
    fn test_seed_changes_with_tier() {
        assert_eq!(derive_seed(&request("alice", 7, "pixel-art")), "alice:7:1");
        assert_eq!(derive_seed(&request("alice", 4, "pixel-art")), "alice:4:0");
        assert_eq!(derive_seed(&request("bob", 100, "bottts")), "bob:100:20");
    }

    #[test]
    fn test_fingerprint_ignores_vector_size() {
        let small = request("alice", 7, "pixel-art");
        let mut bigger_canvas = small.clone();
        bigger_canvas.size.vector_size = 512;

        assert_eq!(derive_fingerprint(&small), derive_fingerprint(&bigger_canvas));
        assert_eq!(derive_seed(&small), derive_seed(&bigger_canvas));

        let mut wider = small.clone();
        wider.size.ascii_width = 40;
        assert_ne!(derive_fingerprint(&small), derive_fingerprint(&wider));
    }

    #[test]
    fn test_basic_tier_is_minimal() {
        let req = request("alice", 3, "pixel-art");
        let params = derive_params(&req, "alice:3:0");

        assert_eq!(params, RemoteParams::with_seed("alice:3:0", 64));
    }

    #[test]
    fn test_accessory_tier() {
        let params = derive_params(&request("alice", 7, "pixel-art"), "s");
        assert_eq!(params.accessories, vec!["glasses"]);
        assert_eq!(params.hair_color.len(), 1);

        let params = derive_params(&request("alice", 6, "pixel-art"), "s");
        assert!(params.accessories.is_empty());

        let params = derive_params(&request("alice", 8, "bottts"), "s");
        assert!(params.accessories.is_empty());
    }

    #[test]
    fn test_color_tier_jitter_and_radius() {
        let params = derive_params(&request("alice", 17, "pixel-art"), "s");
        assert_eq!(params.translate_x, 2);
        assert_eq!(params.translate_y, 1);

        let hash = username_hash("alice");
        assert_eq!(params.radius, 10 + hash % 20);
        assert!((10..30).contains(&params.radius));
    }

    #[test]
    fn test_background_tiers() {
        let params = derive_params(&request("alice", 25, "pixel-art"), "s");
        assert_eq!(params.background_type, vec!["solid"]);
        assert_eq!(params.rotate, 10);

        let params = derive_params(&request("alice", 60, "pixel-art"), "s");
        assert_eq!(params.background_type, vec!["gradientLinear"]);
        assert_eq!(params.scale, 120);
    }

    #[test]
    fn test_legendary_tier_flips_every_seventh_level() {
        assert!(derive_params(&request("alice", 105, "pixel-art"), "s").flip);
        assert!(!derive_params(&request("alice", 106, "pixel-art"), "s").flip);

        let params = derive_params(&request("alice", 105, "pixel-art"), "s");
        assert_eq!(params.accessories, vec!["glasses", "hat"]);
        assert_eq!(params.background_rotation, vec![45, 90, 135, 180]);
    }

    #[test]
    fn test_hair_color_selected_by_username() {
        let palette = ["724133", "f59797", "65c9ff"];
        for name in ["alice", "bob", "carol"] {
            let params = derive_params(&request(name, 5, "pixel-art"), "s");
            let expected = palette[username_hash(name) as usize % palette.len()];
            assert_eq!(params.hair_color, vec![expected.to_string()]);
        }
    }
}
