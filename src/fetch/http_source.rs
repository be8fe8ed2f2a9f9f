//! HTTP-backed image source.
//!
//! Retrieves image bytes with a shared `reqwest` client. Every request is
//! bounded by a timeout and a maximum body size so a slow or huge remote
//! resource cannot tie up the server indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

use super::ImageSource;

/// Default timeout for the whole remote fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default maximum accepted image body (20 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// `ImageSource` that downloads images over HTTP(S).
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use image_filter_server::fetch::{HttpImageSource, ImageSource};
///
/// let source = HttpImageSource::new(Duration::from_secs(10), 5 * 1024 * 1024)?;
/// let bytes = source.fetch_bytes("https://example.com/cat.jpg").await?;
/// ```
#[derive(Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpImageSource {
    /// Create a source with the given request timeout and body size limit.
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("image-filter-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client, max_bytes })
    }

    /// Create a source with default timeout and size limit.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            DEFAULT_MAX_IMAGE_BYTES,
        )
    }

    /// Maximum accepted body size in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Reject early when the server announces the size
        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: len,
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size,
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = url, bytes = body.len(), "Downloaded image body");
        Ok(Bytes::from(body))
    }
}
