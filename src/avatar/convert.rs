//! Raster download and character-art rendering.

use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;
use reqwest::{Client, Url};
use termonaut_core::AvatarSize;
use tracing::debug;

use super::error::AvatarError;
use super::remote::read_body;

pub const DEFAULT_MAX_RASTER_BYTES: usize = 10 * 1024 * 1024;

/// Used for art at least 40 columns wide.
pub const RICH_PALETTE: &str =
    " .'`^\",:;Il!i><~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";
/// Used between 20 and 39 columns.
pub const BALANCED_PALETTE: &str = " .:-=+*#%@";
/// Used below 20 columns.
pub const MINIMAL_PALETTE: &str = " .:+#@";

const RESET: &str = "\x1b[0m";

/// Turns the vector image behind a URL into character art.
#[async_trait]
pub trait ArtConverter: Send + Sync {
    async fn convert(&self, vector_url: &str, size: &AvatarSize) -> Result<String, AvatarError>;
}

/// Pick the character palette for an output width.
pub fn palette_for_width(width: u32) -> &'static str {
    match width {
        40.. => RICH_PALETTE,
        20..=39 => BALANCED_PALETTE,
        _ => MINIMAL_PALETTE,
    }
}

/// Raster equivalent of a vector URL at `size` pixels.
///
/// The last `svg` path segment becomes `png`; `size` is added to the query
/// unless already present.
pub fn raster_url(vector_url: &str, size: u32) -> Result<String, AvatarError> {
    if vector_url.is_empty() {
        return Err(AvatarError::Format("empty vector url".to_string()));
    }

    let mut url = Url::parse(vector_url)
        .map_err(|e| AvatarError::Format(format!("invalid vector url {}: {}", vector_url, e)))?;

    let path = url.path().to_string();
    if let Some(prefix) = path.strip_suffix("/svg") {
        url.set_path(&format!("{}/png", prefix));
    }

    if !url.query_pairs().any(|(key, _)| key == "size") {
        url.query_pairs_mut().append_pair("size", &size.to_string());
    }

    Ok(url.into())
}

/// Downloads the raster form of an avatar and renders it as coloured
/// character art.
#[derive(Debug, Clone)]
pub struct RasterPipeline {
    http_client: Client,
    max_bytes: usize,
}

impl RasterPipeline {
    pub fn new(timeout: Duration) -> Result<Self, AvatarError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            max_bytes: DEFAULT_MAX_RASTER_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AvatarError> {
        debug!("Fetching avatar raster: {}", url);
        let response = self.http_client.get(url).send().await?;
        read_body(response, self.max_bytes).await
    }
}

#[async_trait]
impl ArtConverter for RasterPipeline {
    async fn convert(&self, vector_url: &str, size: &AvatarSize) -> Result<String, AvatarError> {
        let url = raster_url(vector_url, size.vector_size)?;
        let bytes = self.download(&url).await?;

        // The decoder works from a file; the temp file is removed on drop.
        let mut raster = tempfile::Builder::new()
            .prefix("avatar_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| AvatarError::Format(format!("failed to stage raster: {}", e)))?;
        raster
            .write_all(&bytes)
            .and_then(|_| raster.flush())
            .map_err(|e| AvatarError::Format(format!("failed to stage raster: {}", e)))?;

        let image = image::open(raster.path())
            .map_err(|e| AvatarError::Format(format!("failed to decode raster: {}", e)))?;

        let art = trim_blank_rows(&render(&image, size.ascii_width, size.ascii_height));
        if art.is_empty() {
            return Err(AvatarError::EmptyResult);
        }

        Ok(art)
    }
}

/// Drop blank rows above and below the art and trailing blanks on each row.
///
/// Leading blanks are kept so rows stay aligned with one another.
pub fn trim_blank_rows(art: &str) -> String {
    let lines: Vec<&str> = art.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|line| !line.is_empty());
    let last = lines.iter().rposition(|line| !line.is_empty());

    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Render `image` as `width` x `height` characters.
///
/// Each cell picks a palette character by luminance, weighted by alpha.
/// Fully transparent cells are blank. Every visible character gets a 24-bit
/// foreground and each styled line ends with a reset.
pub fn render(image: &DynamicImage, width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return String::new();
    }

    let palette: Vec<char> = palette_for_width(width).chars().collect();
    let last = (palette.len() - 1) as f32;
    let pixels = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgba8();

    let mut lines = Vec::with_capacity(height as usize);
    for y in 0..height {
        let mut line = String::new();
        let mut styled = false;

        for x in 0..width {
            let [r, g, b, a] = pixels.get_pixel(x, y).0;

            if a == 0 {
                line.push(' ');
                continue;
            }

            let alpha = a as f32 / 255.0;
            let luminance =
                (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0 * alpha;
            let index = (luminance.clamp(0.0, 1.0) * last).round() as usize;
            let ch = palette[index];

            if ch == ' ' {
                line.push(' ');
                continue;
            }

            let _ = write!(line, "\x1b[38;2;{};{};{}m{}", r, g, b, ch);
            styled = true;
        }

        let mut line = line.trim_end().to_string();
        if styled {
            line.push_str(RESET);
        }
        lines.push(line);
    }

    lines.join("\n")
}
