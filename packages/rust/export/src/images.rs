//! Fetching and decoding image references for embedding.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use tracing::debug;

use nobestudy_shared::{NobestudyError, Result};

/// A decoded image ready to embed.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub source_url: String,
    image: DynamicImage,
}

impl LoadedImage {
    pub fn from_image(source_url: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            source_url: source_url.into(),
            image,
        }
    }

    /// Decode raw bytes in any supported format.
    pub fn decode(source_url: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let source_url = source_url.into();
        let image = image::load_from_memory(bytes)
            .map_err(|e| NobestudyError::image(format!("{source_url}: decode failed: {e}")))?;
        Ok(Self::from_image(source_url, image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height for a given display width, keeping the aspect ratio.
    pub fn scaled_height(&self, width: f64) -> f64 {
        if self.width() == 0 {
            return 0.0;
        }
        width * f64::from(self.height()) / f64::from(self.width())
    }

    /// Packed 8-bit RGB pixels, row-major.
    pub fn rgb_pixels(&self) -> Vec<u8> {
        self.image.to_rgb8().into_raw()
    }

    /// PNG re-encoding, used by the OOXML formats.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| {
                NobestudyError::image(format!("{}: PNG encode failed: {e}", self.source_url))
            })?;
        Ok(buf.into_inner())
    }
}

/// Payload of a `data:` URI, or `None` when `url` is not one.
/// Only the base64 form is accepted.
fn data_uri_bytes(url: &str) -> Option<Result<Vec<u8>>> {
    let rest = url.strip_prefix("data:")?;
    let decoded = match rest.split_once(',') {
        Some((header, payload)) if header.ends_with(";base64") => STANDARD
            .decode(payload.trim())
            .map_err(|e| NobestudyError::image(format!("data URI: invalid base64: {e}"))),
        Some(_) => Err(NobestudyError::image("data URI: only base64 payloads are supported")),
        None => Err(NobestudyError::image("data URI: missing payload")),
    };
    Some(decoded)
}

/// Loads image references over HTTP. `data:` URIs are decoded in place.
#[derive(Clone)]
pub struct ImageLoader {
    client: Client,
}

impl ImageLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and decode one image. Any failure is fatal for that image.
    pub async fn fetch(&self, url: &str) -> Result<LoadedImage> {
        if let Some(bytes) = data_uri_bytes(url) {
            debug!("decoding inline data URI image");
            return LoadedImage::decode("data URI", &bytes?);
        }

        debug!(url, "fetching image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NobestudyError::image(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NobestudyError::image(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NobestudyError::image(format!("{url}: body read failed: {e}")))?;

        LoadedImage::decode(url, &bytes)
    }

    /// Fetch every reference in order, one at a time. Stops at the first failure.
    pub async fn fetch_all(&self, urls: &[String]) -> Result<Vec<LoadedImage>> {
        let mut images = Vec::with_capacity(urls.len());
        for url in urls {
            images.push(self.fetch(url).await?);
        }
        Ok(images)
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
