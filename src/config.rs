//! Configuration management for the image filter server.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (`PORT`, `ADMIN_USERNAME`, `ADMIN_PASSWORD`, `JWT_SECRET`, ...)
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` (default) - Run the HTTP server
//! - `token` - Print a bearer token signed with the server secret
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 8082)
//! - `ADMIN_USERNAME` - Administrator username (required)
//! - `ADMIN_PASSWORD` - Administrator password (required)
//! - `JWT_SECRET` - Token signing secret (required)
//! - `TOKEN_TTL` - Token lifetime in seconds (default: 86400)
//! - `SCRATCH_DIR` - Artifact directory (default: `<tmp>/image-filter-server`)
//! - `DELETE_DELAY` - Seconds before a served artifact is deleted (default: 60)
//! - `FETCH_TIMEOUT` - Remote fetch timeout in seconds (default: 30)
//! - `MAX_IMAGE_BYTES` - Largest accepted source image (default: 20 MiB)
//! - `CORS_ORIGINS` - Allowed CORS origins, comma separated (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::artifact::DEFAULT_DELETE_DELAY_SECS;
use crate::fetch::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_IMAGE_BYTES};
use crate::server::{Credentials, DEFAULT_TOKEN_TTL_SECS};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8082;

/// Directory name used under the system temp dir when no scratch dir is set.
pub const DEFAULT_SCRATCH_DIR_NAME: &str = "image-filter-server";

/// Default subject for offline token minting.
pub const DEFAULT_TOKEN_SUBJECT: &str = "admin";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Filter Server - greyscale thumbnails of public images.
///
/// Fetches a PNG or JPEG from a public URL, resizes it to 256×256, converts it
/// to greyscale and serves the result as a JPEG. Access requires a bearer
/// token obtained from `POST /auth`.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-filter-server")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options when no subcommand is given
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve(ServeConfig),

    /// Print a bearer token signed with the server secret
    Token(TokenConfig),
}

// =============================================================================
// Serve Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Administrator username accepted by `POST /auth`.
    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Administrator password accepted by `POST /auth`.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Secret key for signing bearer tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "TOKEN_TTL")]
    pub token_ttl: u64,

    // =========================================================================
    // Pipeline Configuration
    // =========================================================================
    /// Directory for transformed images awaiting deletion.
    #[arg(long, env = "SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Seconds a served artifact is kept before deletion.
    #[arg(long, default_value_t = DEFAULT_DELETE_DELAY_SECS, env = "DELETE_DELAY")]
    pub delete_delay: u64,

    /// Timeout for fetching a remote image, in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    /// Largest accepted source image in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES, env = "MAX_IMAGE_BYTES")]
    pub max_image_bytes: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if is_blank(&self.admin_username) {
            return Err(
                "Admin username is required. Set --admin-username or ADMIN_USERNAME".to_string(),
            );
        }
        if is_blank(&self.admin_password) {
            return Err(
                "Admin password is required. Set --admin-password or ADMIN_PASSWORD".to_string(),
            );
        }
        if is_blank(&self.jwt_secret) {
            return Err("Token secret is required. Set --jwt-secret or JWT_SECRET".to_string());
        }

        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }
        if self.fetch_timeout == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }
        if self.max_image_bytes == 0 {
            return Err("max_image_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Scratch directory, falling back to a folder in the system temp dir.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_SCRATCH_DIR_NAME))
    }

    /// Administrator credentials (call validate() first).
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.admin_username.as_deref().unwrap_or(""),
            self.admin_password.as_deref().unwrap_or(""),
        )
    }

    /// Get the token secret, or an empty string if not set (call validate() first).
    pub fn jwt_secret_or_empty(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or("")
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }

    pub fn delete_delay(&self) -> Duration {
        Duration::from_secs(self.delete_delay)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

// =============================================================================
// Token Configuration
// =============================================================================

/// Output format of the `token` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOutputFormat {
    /// The bare token
    #[default]
    Token,
    /// JSON with the token, subject and expiry
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Secret key used by the server to sign tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Subject (username) embedded in the token.
    #[arg(long, default_value = DEFAULT_TOKEN_SUBJECT, env = "ADMIN_USERNAME")]
    pub subject: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "TOKEN_TTL")]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("Token secret must not be empty".to_string());
        }
        if self.subject.is_empty() {
            return Err("Subject must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
