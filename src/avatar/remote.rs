//! Remote avatar source speaking the DiceBear HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use termonaut_core::{is_style_supported, SUPPORTED_STYLES};
use tracing::debug;

use super::error::AvatarError;
use super::policy::RemoteParams;

pub const DEFAULT_BASE_URL: &str = "https://api.dicebear.com/9.x";

/// Marker every vector document must contain.
const VECTOR_MARKER: &[u8] = b"<svg";

/// Upper bound on a vector document body.
const MAX_VECTOR_BYTES: usize = 2 * 1024 * 1024;

/// Something that can turn a style and parameters into a vector image.
#[async_trait]
pub trait VectorSource: Send + Sync {
    /// URL of the vector image for `style` and `params`
    fn build_url(&self, style: &str, params: &RemoteParams) -> Result<String, AvatarError>;

    /// Download the vector image
    async fn fetch_vector(&self, style: &str, params: &RemoteParams)
        -> Result<Vec<u8>, AvatarError>;

    fn supported_styles(&self) -> &[&'static str] {
        SUPPORTED_STYLES
    }

    fn is_style_supported(&self, style: &str) -> bool {
        is_style_supported(style)
    }
}

/// HTTP client for a DiceBear-compatible service
#[derive(Debug, Clone)]
pub struct DiceBearClient {
    http_client: Client,
    base_url: String,
}

impl DiceBearClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AvatarError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn style_path_is_safe(style: &str) -> bool {
        style
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

fn join(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

#[async_trait]
impl VectorSource for DiceBearClient {
    fn build_url(&self, style: &str, params: &RemoteParams) -> Result<String, AvatarError> {
        if style.is_empty() || !Self::style_path_is_safe(style) {
            return Err(AvatarError::InvalidStyle(style.to_string()));
        }

        let mut url = Url::parse(&format!("{}/{}/svg", self.base_url, style))
            .map_err(|e| AvatarError::Validation(format!("bad base url {}: {}", self.base_url, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("seed", &params.seed);
            query.append_pair("size", &params.size.to_string());

            if style == "pixel-art" {
                if let Some(hair) = join(&params.hair_color) {
                    query.append_pair("hairColor", &hair);
                }
            }
            if let Some(background) = join(&params.background_type) {
                query.append_pair("backgroundType", &background);
            }
            if !params.background_rotation.is_empty() {
                let rotation: Vec<String> = params
                    .background_rotation
                    .iter()
                    .map(|r| r.to_string())
                    .collect();
                query.append_pair("backgroundRotation", &rotation.join(","));
            }
            if let Some(accessories) = join(&params.accessories) {
                query.append_pair("accessories", &accessories);
            }
            if let Some(colors) = join(&params.accessories_color) {
                query.append_pair("accessoriesColor", &colors);
            }
            if params.flip {
                query.append_pair("flip", "true");
            }
            if params.rotate > 0 {
                query.append_pair("rotate", &params.rotate.to_string());
            }
            if params.scale > 0 {
                query.append_pair("scale", &params.scale.to_string());
            }
            if params.radius > 0 {
                query.append_pair("radius", &params.radius.to_string());
            }
            if params.translate_x > 0 {
                query.append_pair("translateX", &params.translate_x.to_string());
            }
            if params.translate_y > 0 {
                query.append_pair("translateY", &params.translate_y.to_string());
            }
        }

        Ok(url.into())
    }

    async fn fetch_vector(
        &self,
        style: &str,
        params: &RemoteParams,
    ) -> Result<Vec<u8>, AvatarError> {
        let url = self.build_url(style, params)?;
        debug!("Fetching avatar vector: {}", url);

        let response = self.http_client.get(&url).send().await?;
        let body = read_body(response, MAX_VECTOR_BYTES).await?;

        if !contains(&body, VECTOR_MARKER) {
            return Err(AvatarError::Format(
                "response is not an SVG document".to_string(),
            ));
        }

        Ok(body)
    }
}

/// Check the status and read at most `limit` bytes of the body.
pub(crate) async fn read_body(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, AvatarError> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(AvatarError::Upstream {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(AvatarError::Format(format!(
                "response body exceeds {} bytes",
                limit
            )));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DiceBearClient {
        DiceBearClient::new(DEFAULT_BASE_URL, Duration::from_secs(10)).unwrap()
    }

    fn query(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_build_url_minimal() {
        let url = client()
            .build_url("pixel-art", &RemoteParams::with_seed("alice:3:0", 64))
            .unwrap();

        assert!(url.starts_with("https://api.dicebear.com/9.x/pixel-art/svg?"));
        assert_eq!(
            query(&url),
            vec![
                ("seed".to_string(), "alice:3:0".to_string()),
                ("size".to_string(), "64".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_url_carries_tier_params() {
        let mut params = RemoteParams::with_seed("bob:105:21", 128);
        params.hair_color = vec!["4ecdc4".to_string()];
        params.background_type = vec!["gradientLinear".into(), "gradientRadial".into()];
        params.background_rotation = vec![45, 90];
        params.accessories = vec!["glasses".into(), "hat".into()];
        params.flip = true;
        params.radius = 12;

        let pairs = query(&client().build_url("pixel-art", &params).unwrap());
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("hairColor"), Some("4ecdc4"));
        assert_eq!(get("backgroundType"), Some("gradientLinear,gradientRadial"));
        assert_eq!(get("backgroundRotation"), Some("45,90"));
        assert_eq!(get("accessories"), Some("glasses,hat"));
        assert_eq!(get("flip"), Some("true"));
        assert_eq!(get("radius"), Some("12"));
        assert_eq!(get("rotate"), None);
    }

    #[test]
    fn test_hair_color_only_for_pixel_art() {
        let mut params = RemoteParams::with_seed("s", 64);
        params.hair_color = vec!["724133".to_string()];

        let url = client().build_url("bottts", &params).unwrap();
        assert!(!url.contains("hairColor"));
    }

    #[test]
    fn test_build_url_rejects_bad_style() {
        let params = RemoteParams::with_seed("s", 64);
        assert_eq!(
            client().build_url("", &params),
            Err(AvatarError::InvalidStyle(String::new()))
        );
        assert!(matches!(
            client().build_url("../admin", &params),
            Err(AvatarError::InvalidStyle(_))
        ));
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let client = DiceBearClient::new("http://localhost:9/", Duration::from_secs(1)).unwrap();
        let url = client
            .build_url("bottts", &RemoteParams::with_seed("s", 32))
            .unwrap();
        assert!(url.starts_with("http://localhost:9/bottts/svg?"));
    }

    #[test]
    fn test_style_catalogue() {
        let client = client();
        assert_eq!(client.supported_styles().len(), 20);
        assert!(client.is_style_supported("adventurer"));
        assert!(!client.is_style_supported("nonexistent"));
    }
}
