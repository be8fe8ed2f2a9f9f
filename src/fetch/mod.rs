//! Remote image retrieval.
//!
//! The fetch layer turns an image URL into a decoded, in-memory image:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              ImageFetcher               │
//! │   (bytes → decode on blocking pool)     │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ImageSource Trait             │
//! │  (where the raw bytes come from)        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            HttpImageSource              │
//! │  (reqwest, timeout, size limit)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! No retry is performed here. A failed fetch surfaces as a single
//! [`FetchError`](crate::error::FetchError) carrying the cause.

mod fetcher;
mod http_source;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

pub use fetcher::{decode_image, ImageFetcher};
pub use http_source::{HttpImageSource, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_IMAGE_BYTES};

/// Trait for retrieving the raw bytes behind an image URL.
///
/// Implementations must be thread-safe; the pipeline shares one source
/// across all concurrent requests.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Retrieve the full body of the resource at `url`.
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, FetchError>;
}
