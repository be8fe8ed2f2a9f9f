//! Router configuration for the image filter server.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS, tracing and panic recovery.
//!
//! # Route Structure
//!
//! ```text
//! /                                   - Usage hint (public)
//! /health                             - Health check (public)
//! /auth                               - Login, POST (public)
//! /filteredimage?image_url={url}      - Filtered image (bearer token)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use image_filter_server::server::routes::{create_router, RouterConfig};
//! use image_filter_server::server::auth::Credentials;
//!
//! let config = RouterConfig::new(Credentials::new("admin", "password"), "my-secret-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(pipeline, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8082").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::any::Any;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use super::auth::{bearer_auth_middleware, Credentials, TokenAuth, DEFAULT_TOKEN_TTL_SECS};
use super::handlers::{
    filtered_image_handler, health_handler, login_handler, root_handler, AppState, ErrorResponse,
};
use crate::fetch::ImageSource;
use crate::pipeline::FilterPipeline;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Administrator credentials accepted by `/auth`
    pub credentials: Credentials,

    /// Secret key for token signing
    pub token_secret: String,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - Tokens live for 24 hours
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(credentials: Credentials, token_secret: impl Into<String>) -> Self {
        Self {
            credentials,
            token_secret: token_secret.into(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set the lifetime of issued tokens.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Build the token service described by this configuration.
    pub fn token_auth(&self) -> TokenAuth {
        TokenAuth::new(&self.token_secret, self.token_ttl)
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (usage hint, health check, login)
/// - The token-protected image route
/// - CORS configuration
/// - Panic recovery returning a generic 500
/// - Request tracing (optional)
pub fn create_router<S>(pipeline: FilterPipeline<S>, config: RouterConfig) -> Router
where
    S: ImageSource + 'static,
{
    let auth = config.token_auth();
    let app_state = AppState::new(pipeline, auth.clone(), config.credentials.clone());

    // route_layer keeps unknown paths as 404 instead of auth failures
    let protected_routes = Router::new()
        .route("/filteredimage", get(filtered_image_handler::<S>))
        .route_layer(middleware::from_fn_with_state(auth, bearer_auth_middleware))
        .with_state(app_state.clone());

    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/auth", post(login_handler::<S>))
        .with_state(app_state);

    let router = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(build_cors_layer(&config))
        .layer(CatchPanicLayer::custom(handle_panic));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(AnyOrigin),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

/// Turn a panic in the request path into a logged, generic 500.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!("Request handler panicked: {}", detail);

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let body = ErrorResponse::with_status("internal_error", "Internal Server Error", status);
    (status, Json(body)).into_response()
}

// =============================================================================
// Tests
// =============================================================================
