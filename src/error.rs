use thiserror::Error;

/// Errors raised while retrieving and decoding a remote image
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network or connection error (includes timeouts)
    #[error("Request failed: {0}")]
    Request(String),

    /// Remote server answered with a non-success status
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Response body exceeds the configured limit
    #[error("Image too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// Body is not a decodable PNG or JPEG image
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Errors raised while transforming and encoding a decoded image
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// JPEG encoding failed
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The blocking transform task panicked or was cancelled
    #[error("Transform task failed: {0}")]
    Task(String),
}

/// Errors raised by the artifact store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Filesystem error while writing or reading an artifact
    #[error("Artifact I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The background pipeline task panicked or was cancelled
    #[error("Pipeline task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by the filter pipeline
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The requested URL is missing or does not name a PNG/JPEG image (HTTP 422)
    #[error("Image url is required and must be a jpg or png but got {url:?}")]
    InvalidImageUrl { url: String },

    /// Retrieving or decoding the source image failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Transforming or encoding the image failed
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Persisting or reading back the artifact failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether the failure was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidImageUrl { .. })
    }
}
