//! Offline avatar synthesis.
//!
//! Produces a deterministic gradient badge and a boxed character-art card
//! from the request alone, so a user always gets an avatar when the remote
//! service is unreachable.

use chrono::Utc;
use termonaut_core::{Avatar, AvatarRequest, FALLBACK_SUFFIX};

use super::policy::username_hash;

/// Build a complete fallback avatar.
pub fn synthesize(request: &AvatarRequest, seed: &str, fingerprint: &str) -> Avatar {
    Avatar {
        username: request.username.clone(),
        level: request.level,
        style: format!("{}{}", request.style, FALLBACK_SUFFIX),
        size: request.size,
        vector_bytes: vector_image(request).into_bytes(),
        ascii_art: character_art(request),
        seed: seed.to_string(),
        generated_at: Utc::now(),
        fingerprint: fingerprint.to_string(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Gradient circle with the user's initial and level, coloured by
/// username and level.
pub fn vector_image(request: &AvatarRequest) -> String {
    let level = request.level;
    let hue = (username_hash(&request.username) as u64 + level as u64 * 30) % 360;
    let saturation = 60 + level % 40;
    let lightness = 40 + level % 30;

    let size = request.size.vector_size;
    let center = size / 2;
    let radius = center.saturating_sub(5);
    let initial = escape_xml(&request.initial().to_string());

    format!(
        r#"<svg width="{size}" height="{size}" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="grad" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:hsl({hue}, {saturation}%, {lightness}%);stop-opacity:1" />
      <stop offset="100%" style="stop-color:hsl({hue2}, {saturation2}%, {lightness2}%);stop-opacity:1" />
    </linearGradient>
  </defs>
  <circle cx="{center}" cy="{center}" r="{radius}" fill="url(#grad)" />
  <text x="{center}" y="{initial_y}" font-family="monospace" font-size="{initial_font}" fill="white" text-anchor="middle">{initial}</text>
  <text x="{center}" y="{level_y}" font-family="monospace" font-size="{level_font}" fill="white" text-anchor="middle">Lv{level}</text>
</svg>"#,
        hue2 = (hue + 60) % 360,
        saturation2 = saturation - 10,
        lightness2 = lightness + 10,
        initial_y = center.saturating_sub(5),
        initial_font = (size / 8).max(1),
        level_y = center + 15,
        level_font = (size / 12).max(1),
    )
}

/// Bordered card with the initial and level centred inside.
///
/// Below 10x5 there is no room for a frame, so a bracketed tag such as
/// `[a7]` is returned instead.
pub fn character_art(request: &AvatarRequest) -> String {
    let width = request.size.ascii_width as usize;
    let height = request.size.ascii_height as usize;
    let initial = request.initial();

    if width < 10 || height < 5 {
        return format!("[{}{}]", initial, request.level);
    }

    let inner = width - 2;
    let content: String = format!("{} Lv{}", initial, request.level)
        .chars()
        .take(inner)
        .collect();
    let content_len = content.chars().count();
    let left = (inner - content_len) / 2;
    let right = inner - content_len - left;

    let rule = "=".repeat(width);
    let blank = format!("|{}|", " ".repeat(inner));
    let content_line = format!("|{}{}{}|", " ".repeat(left), content, " ".repeat(right));

    let rows = height - 2;
    let content_row = rows / 2;

    let mut lines = Vec::with_capacity(height);
    lines.push(rule.clone());
    for row in 0..rows {
        if row == content_row {
            lines.push(content_line.clone());
        } else {
            lines.push(blank.clone());
        }
    }
    lines.push(rule);

    lines.join("\n")
}
