//! # Image Filter Server
//!
//! A small authenticated HTTP service that turns public images into greyscale
//! thumbnails.
//!
//! A client exchanges the administrator credentials for a bearer token at
//! `POST /auth`, then calls `GET /filteredimage?image_url=<url>`. The server
//! fetches the PNG or JPEG at `<url>`, resizes it to exactly 256×256, converts
//! it to greyscale, encodes it as a quality-60 JPEG, stores it under a unique
//! name and returns it. Each stored file is deleted a fixed delay after it
//! was served.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`fetch`] - Remote image retrieval and decoding
//! - [`transform`] - Resize, greyscale and JPEG encoding
//! - [`artifact`] - Scratch storage with deferred deletion
//! - [`pipeline`] - URL validation and the per-request job
//! - [`server`] - Axum-based HTTP server, routes and token auth
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use image_filter_server::{
//!     create_router, ArtifactStore, Credentials, FilterPipeline, HttpImageSource, RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ArtifactStore::open("/tmp/image-filter-server", Duration::from_secs(60)).await?;
//!     let pipeline = FilterPipeline::new(HttpImageSource::with_defaults()?, store);
//!
//!     let config = RouterConfig::new(Credentials::new("admin", "password"), "my-secret-key");
//!     let router = create_router(pipeline, config);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8082").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod server;
pub mod transform;

// Re-export commonly used types
pub use artifact::{ArtifactPath, ArtifactStore, DEFAULT_DELETE_DELAY_SECS};
pub use config::{Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat};
pub use error::{FetchError, PipelineError, StoreError, TransformError};
pub use fetch::{
    decode_image, HttpImageSource, ImageFetcher, ImageSource, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_IMAGE_BYTES,
};
pub use pipeline::{
    validate_image_url, FilterPipeline, FilteredImage, ImageJob, JobState, ALLOWED_EXTENSIONS,
};
pub use server::{
    authorize, bearer_auth_middleware, create_router, AppState, AuthError, Credentials,
    ErrorResponse, RouterConfig, TokenAuth, TokenClaims, TokenError,
};
pub use transform::{ImageTransformer, OUTPUT_HEIGHT, OUTPUT_JPEG_QUALITY, OUTPUT_WIDTH};
