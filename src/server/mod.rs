//! HTTP server layer for the image filter service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     POST /auth            GET /filteredimage?image_url=...      │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  handlers   │  │    auth      │  │        routes          │  │
//! │  │ (requests)  │  │(bearer token)│  │  (router config)       │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{
    authorize, bearer_auth_middleware, AuthError, Credentials, TokenAuth, TokenClaims, TokenError,
    BEARER_PREFIX, DEFAULT_TOKEN_TTL_SECS,
};
pub use handlers::{
    filtered_image_handler, health_handler, login_handler, root_handler, AppState, ErrorResponse,
    FilteredImageParams, HandlerError, HealthResponse, LoginRequest, LoginResponse,
    PROCESSING_FAILURE_MESSAGE, USAGE_HINT,
};
pub use routes::{create_router, RouterConfig};
