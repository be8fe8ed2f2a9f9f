//! HTTP request handlers for the image filter API.
//!
//! # Endpoints
//!
//! - `GET /` - Usage hint
//! - `GET /health` - Health check endpoint
//! - `POST /auth` - Exchange admin credentials for a bearer token
//! - `GET /filteredimage?image_url=...` - Filter a public image (bearer token required)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, RawQuery, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::PipelineError;
use crate::fetch::ImageSource;
use crate::pipeline::FilterPipeline;

use super::auth::{AuthError, Credentials, TokenAuth};

/// Plain-text hint served at `/`.
pub const USAGE_HINT: &str = "try GET /filteredimage?image_url={{}}";

/// Message returned for every processing failure; causes stay in the logs.
pub const PROCESSING_FAILURE_MESSAGE: &str = "Error while filtering image";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: ImageSource> {
    /// The filter pipeline for image requests
    pub pipeline: FilterPipeline<S>,

    /// Token service used by the login endpoint
    pub auth: TokenAuth,

    /// Administrator credentials accepted by the login endpoint
    pub credentials: Credentials,
}

impl<S: ImageSource + 'static> AppState<S> {
    /// Create a new application state.
    pub fn new(pipeline: FilterPipeline<S>, auth: TokenAuth, credentials: Credentials) -> Self {
        Self {
            pipeline,
            auth,
            credentials,
        }
    }
}

impl<S: ImageSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            auth: self.auth.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for the filtered image endpoint.
#[derive(Debug, Deserialize)]
pub struct FilteredImageParams {
    /// Public URL of a `.png` or `.jpg` image
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Body of a login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_image_url", "invalid_token")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,

    /// Seconds until the token expires
    pub expires_in: u64,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Wrapper for pipeline errors to implement IntoResponse.
///
/// Invalid URLs are client errors (422). Everything else is reported as a
/// generic 500 without the underlying cause.
pub struct HandlerError(pub PipelineError);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = if self.0.is_client_error() {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_image_url",
                self.0.to_string(),
            )
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing_error",
                PROCESSING_FAILURE_MESSAGE.to_string(),
            )
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self.0
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

impl From<PipelineError> for HandlerError {
    fn from(err: PipelineError) -> Self {
        HandlerError(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle root requests with a usage hint.
pub async fn root_handler() -> &'static str {
    USAGE_HINT
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle login requests.
///
/// # Endpoint
///
/// `POST /auth` with body `{"username": "...", "password": "..."}`
///
/// # Response
///
/// - `200 OK`: `{"token": "...", "expires_in": 86400}`
/// - `401 Unauthorized`: Wrong username or password
/// - `422 Unprocessable Entity`: Body missing, not JSON, or missing fields
pub async fn login_handler<S: ImageSource + 'static>(
    State(state): State<AppState<S>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(login) = body.map_err(|e| AuthError::InvalidLoginBody(e.body_text()))?;

    if !state.credentials.matches(&login.username, &login.password) {
        return Err(AuthError::InvalidCredentials);
    }

    let token = state
        .auth
        .issue(&login.username)
        .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

    Ok(Json(LoginResponse {
        token,
        expires_in: state.auth.ttl().as_secs(),
    }))
}

/// Handle filtered image requests.
///
/// # Endpoint
///
/// `GET /filteredimage?image_url={url}`
///
/// Requires `Authorization: Bearer <token>` (enforced by middleware).
///
/// # Response
///
/// - `200 OK`: 256×256 greyscale JPEG with `Content-Type: image/jpeg`
/// - `422 Unprocessable Entity`: Missing URL, unparseable query, or URL not
///   ending in `.png`/`.jpg`
/// - `500 Internal Server Error`: Fetch, decode, transform or storage failure
pub async fn filtered_image_handler<S: ImageSource + 'static>(
    State(state): State<AppState<S>>,
    RawQuery(raw_query): RawQuery,
    query: Result<Query<FilteredImageParams>, QueryRejection>,
) -> Result<Response, HandlerError> {
    let Query(params) = query.map_err(|rejection| {
        debug!("Rejected query string: {}", rejection.body_text());
        HandlerError(PipelineError::InvalidImageUrl {
            url: raw_query.unwrap_or_default(),
        })
    })?;

    let image_url = params.image_url.unwrap_or_default();
    let image = state.pipeline.filter_image(&image_url).await?;

    let response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (
                header::HeaderName::from_static("x-artifact-id"),
                image.job_id.to_string(),
            ),
        ],
        image.data,
    )
        .into_response();

    Ok(response)
}

// =============================================================================
// Tests
// =============================================================================
