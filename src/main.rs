//! Image Filter Server - greyscale thumbnails of public images.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_filter_server::{
    artifact::ArtifactStore,
    config::{Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat},
    fetch::HttpImageSource,
    pipeline::FilterPipeline,
    server::{create_router, RouterConfig, TokenAuth},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let scratch_dir = config.scratch_dir();

    print_banner();

    info!("Configuration:");
    info!("  Scratch dir: {}", scratch_dir.display());
    info!("  Delete delay: {}s", config.delete_delay);
    info!(
        "  Fetch: {}s timeout, {}MB max",
        config.fetch_timeout,
        config.max_image_bytes / (1024 * 1024)
    );
    info!("  Token TTL: {}s", config.token_ttl);
    if config.delete_delay == 0 {
        warn!("  Delete delay is 0: artifacts are removed as soon as they are served");
    }

    let store = match ArtifactStore::open(&scratch_dir, config.delete_delay()).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open scratch directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Files older than the delete delay were orphaned by a previous run
    match store.sweep_stale(config.delete_delay()).await {
        Ok(0) => {}
        Ok(removed) => info!("  Removed {} stale artifact(s)", removed),
        Err(e) => warn!("  Failed to sweep scratch directory: {}", e),
    }

    let source = match HttpImageSource::new(config.fetch_timeout(), config.max_image_bytes) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = FilterPipeline::new(source, store);
    let router = create_router(pipeline, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Get a token:");
    info!(
        "    curl -X POST -H 'Content-Type: application/json' -d '{{\"username\":\"...\",\"password\":\"...\"}}' http://{}/auth",
        addr
    );
    info!("");
    info!("  Filter an image:");
    info!(
        "    curl -H 'Authorization: Bearer <token>' 'http://{}/filteredimage?image_url=<url>.jpg' -o out.jpg",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("┌─────────────────────────────────────┐");
    info!("│        I M A G E   F I L T E R      │");
    info!("│   256×256 · greyscale · JPEG q60    │");
    info!("└─────────────────────────────────────┘");
    info!("                v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_filter_server=debug,tower_http=debug"
    } else {
        "image_filter_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.credentials(), config.jwt_secret_or_empty())
        .with_token_ttl(config.token_ttl());

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests");
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let auth = TokenAuth::new(&config.jwt_secret, Duration::from_secs(config.ttl));

    let token = match auth.issue(&config.subject) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        TokenOutputFormat::Token => {
            println!("{}", token);
        }
        TokenOutputFormat::Json => {
            let claims = match auth.decode(&token) {
                Ok(claims) => claims,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            let json = serde_json::json!({
                "token": token,
                "subject": claims.sub,
                "issued_at": claims.iat,
                "expires_at": claims.exp,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
