use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::error::FetchError;

use super::ImageSource;

/// Fetches remote images and decodes them into pixels.
///
/// Decoding is CPU bound and runs on tokio's blocking pool so a large image
/// never stalls other requests.
pub struct ImageFetcher<S: ImageSource> {
    source: Arc<S>,
}

impl<S: ImageSource> ImageFetcher<S> {
    /// Create a fetcher backed by the given source.
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Access the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Retrieve `url` and decode it.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the resource is unreachable, returns a
    /// non-success status, is too large, or is not a PNG/JPEG image.
    pub async fn fetch(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let data = self.source.fetch_bytes(url).await?;
        debug!(url = url, bytes = data.len(), "Fetched source image");

        tokio::task::spawn_blocking(move || decode_image(&data))
            .await
            .map_err(|e| FetchError::Decode(format!("decode task failed: {}", e)))?
    }
}

impl<S: ImageSource> Clone for ImageFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

/// Decode PNG or JPEG bytes, sniffing the format from the content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, FetchError> {
    if data.is_empty() {
        return Err(FetchError::Decode("empty response body".to_string()));
    }
    image::load_from_memory(data).map_err(|e| FetchError::Decode(e.to_string()))
}
