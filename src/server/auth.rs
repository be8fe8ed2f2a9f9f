//! Bearer token authentication.
//!
//! This module issues and verifies HS256 JSON Web Tokens and guards the
//! image endpoint with a bearer-token middleware.
//!
//! # Token Format
//!
//! ```text
//! token     = JWT, header {"alg": "HS256", "typ": "JWT"}
//! claims    = {"sub": "<username>", "iat": <unix secs>, "exp": <unix secs>}
//! ```
//!
//! Tokens are stateless: validity is decided by the signature and the expiry
//! alone. There is no revocation list.
//!
//! # Security Properties
//!
//! - **Subject + expiry binding**: the signature covers the whole claims payload
//! - **Time-limited**: a token is valid only while `now < exp`
//! - **Pinned algorithm**: only HS256 is accepted, whatever the token header says
//! - **Constant-time comparison**: login credentials are compared with `subtle`
//!   to prevent timing attacks
//!
//! # Example
//!
//! ```rust
//! use image_filter_server::server::auth::TokenAuth;
//! use std::time::Duration;
//!
//! let auth = TokenAuth::new("my-secret-key", Duration::from_secs(3600));
//! let token = auth.issue("admin").unwrap();
//!
//! assert!(auth.verify(&token));
//! assert!(!auth.verify("not-a-token"));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// Authorization scheme prefix expected in the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Authenticated username
    pub sub: String,

    /// Issued-at (Unix epoch seconds)
    pub iat: u64,

    /// Expiry (Unix epoch seconds)
    pub exp: u64,
}

/// Reasons a token fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token is not a decodable HS256 JWT, or lacks a required claim
    #[error("Malformed token")]
    Malformed,

    /// Signature does not match the payload
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token expired
    #[error("Token expired at {expired_at} (current time: {current_time})")]
    Expired { expired_at: u64, current_time: u64 },

    /// Claims could not be serialized
    #[error("Failed to encode token claims: {0}")]
    Encode(String),
}

/// Authentication and authorization errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No `Authorization` header on a protected request
    MissingToken,

    /// Header present but the token is malformed, tampered or expired
    InvalidToken,

    /// Login attempted with a wrong username or password
    InvalidCredentials,

    /// Login body is missing, not JSON, or lacks required fields
    InvalidLoginBody(String),

    /// Token could not be issued
    TokenIssue(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing bearer token in Authorization header"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::InvalidLoginBody(reason) => write!(f, "Invalid login request: {}", reason),
            AuthError::TokenIssue(_) => write!(f, "Failed to issue token"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::MissingToken => (StatusCode::UNPROCESSABLE_ENTITY, "missing_token"),
            AuthError::InvalidToken => (StatusCode::FORBIDDEN, "invalid_token"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::InvalidLoginBody(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_login_request")
            }
            AuthError::TokenIssue(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let message = self.to_string();

        // Rejected tokens and failed logins could indicate an attack
        match &self {
            AuthError::InvalidToken | AuthError::InvalidCredentials => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            AuthError::TokenIssue(cause) => {
                error!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Token issue failed: {}",
                    cause
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Token Service
// =============================================================================

/// Issues and verifies signed, time-limited tokens.
///
/// The secret and lifetime are fixed at construction; nothing is read from
/// the process environment.
#[derive(Clone)]
pub struct TokenAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,

    /// Lifetime of issued tokens
    ttl: Duration,
}

impl std::fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuth")
            .field("keys", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenAuth {
    /// Create a token service.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - The HS256 signing secret. Should be at least 32 bytes
    ///   for security.
    /// * `ttl` - How long issued tokens stay valid
    pub fn new(secret_key: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret_key.as_ref();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject`, valid from now for the configured TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, unix_now())
    }

    /// Issue a token as if the current time were `now` (Unix epoch seconds).
    pub fn issue_at(&self, subject: &str, now: u64) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Whether `token` is currently valid.
    ///
    /// Never fails: malformed, tampered and expired tokens are simply invalid.
    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, unix_now())
    }

    /// Whether `token` is valid at time `now` (Unix epoch seconds).
    pub fn verify_at(&self, token: &str, now: u64) -> bool {
        match self.decode_at(token, now) {
            Ok(_) => true,
            Err(e) => {
                debug!("Token rejected: {}", e);
                false
            }
        }
    }

    /// Decode and validate `token`, returning its claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, unix_now())
    }

    /// Decode and validate `token` at time `now` (Unix epoch seconds).
    pub fn decode_at(&self, token: &str, now: u64) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed,
            })?;
        let claims = data.claims;

        // exp is checked here against the injected clock rather than the library's
        if now >= claims.exp {
            return Err(TokenError::Expired {
                expired_at: claims.exp,
                current_time: now,
            });
        }

        Ok(claims)
    }

    /// HS256 only, `sub` and `exp` required, no leeway.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

/// Current time as Unix epoch seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Credentials
// =============================================================================

/// The static administrator username/password pair.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Compare a login attempt against the configured pair in constant time.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let pass_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        (user_ok & pass_ok).into()
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Decide whether a request may reach the image pipeline.
///
/// - no `Authorization` header → [`AuthError::MissingToken`]
/// - header present, not `Bearer <token>` or token rejected → [`AuthError::InvalidToken`]
/// - header present, token verified → `Ok(())`
pub fn authorize(headers: &HeaderMap, auth: &TokenAuth) -> Result<(), AuthError> {
    let header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .unwrap_or("");

    if token.is_empty() || !auth.verify(token) {
        return Err(AuthError::InvalidToken);
    }

    Ok(())
}

/// Axum middleware requiring a valid bearer token.
///
/// Rejected requests never reach the handler, so no fetch is made for them.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware, routing::get};
/// use image_filter_server::server::auth::{TokenAuth, bearer_auth_middleware};
///
/// let auth = TokenAuth::new("secret-key", Duration::from_secs(3600));
/// let app = Router::new()
///     .route("/filteredimage", get(filtered_image_handler))
///     .route_layer(middleware::from_fn_with_state(auth, bearer_auth_middleware));
/// ```
pub async fn bearer_auth_middleware(
    State(auth): State<TokenAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    authorize(request.headers(), &auth)?;
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
