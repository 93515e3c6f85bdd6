use crate::error::{DescribeError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::PathBuf;
use tracing::instrument;

/// Where the bytes of an image live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocator {
    DataUrl(String),
    Remote(String),
    File(PathBuf),
}

impl ImageLocator {
    pub fn parse(locator: &str) -> Self {
        if locator.starts_with("data:") {
            ImageLocator::DataUrl(locator.to_string())
        } else if locator.starts_with("http://") || locator.starts_with("https://") {
            ImageLocator::Remote(locator.to_string())
        } else {
            let path = locator.strip_prefix("file://").unwrap_or(locator);
            ImageLocator::File(PathBuf::from(path))
        }
    }
}

/// Fetches an image and turns it into a bare Base64 payload for the
/// describe request.
#[derive(Clone, Default)]
pub struct ImageEncoder {
    http: reqwest::Client,
}

impl ImageEncoder {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    #[instrument(skip(self, locator))]
    pub async fn encode(&self, locator: &ImageLocator) -> Result<String> {
        match locator {
            ImageLocator::DataUrl(url) => {
                // Percent-encoded data URLs are not produced for images.
                if !url.split(',').next().is_some_and(|h| h.ends_with(";base64")) {
                    return Err(DescribeError::Read(
                        "data URL is not Base64 encoded".to_string(),
                    ));
                }
                let payload = strip_data_url_prefix(url);
                general_purpose::STANDARD
                    .decode(payload)
                    .map_err(|e| DescribeError::Read(e.to_string()))?;
                Ok(payload.to_string())
            }
            ImageLocator::Remote(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| DescribeError::Fetch(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(DescribeError::Fetch(status.to_string()));
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| DescribeError::Read(e.to_string()))?;
                tracing::debug!(bytes = bytes.len(), "fetched remote image");
                Ok(general_purpose::STANDARD.encode(&bytes))
            }
            ImageLocator::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| DescribeError::Fetch(format!("{}: {e}", path.display())))?;
                Ok(general_purpose::STANDARD.encode(&bytes))
            }
        }
    }
}

/// Drops a leading `data:<mime>;base64,` header, if any.
pub fn strip_data_url_prefix(value: &str) -> &str {
    if value.starts_with("data:") {
        value.split_once(',').map(|(_, payload)| payload).unwrap_or("")
    } else {
        value
    }
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Sniffs the media type from the leading bytes. Used when an upload arrives
/// without a usable content type.
pub fn media_type_of(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    let mime = match format {
        image::ImageFormat::Png => "image/png",
        image::ImageFormat::Jpeg => "image/jpeg",
        image::ImageFormat::Gif => "image/gif",
        image::ImageFormat::WebP => "image/webp",
        image::ImageFormat::Bmp => "image/bmp",
        image::ImageFormat::Tiff => "image/tiff",
        image::ImageFormat::Ico => "image/x-icon",
        _ => return None,
    };
    Some(mime)
}
