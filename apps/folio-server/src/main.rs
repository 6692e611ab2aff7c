//! Folio Server
//!
//! Serves page thumbnails and page-edit operations for PDFs named on the
//! command line or uploaded over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_server::config::Config;
use folio_server::engine::{ImageCrateEncoder, MupdfEngine};
use folio_server::routes;
use folio_server::state::AppState;

#[derive(Parser)]
#[command(name = "folio-server", version, about = "PDF page editing server")]
struct Args {
    /// PDF files to open at startup
    files: Vec<PathBuf>,

    /// Port to listen on (overrides SERVER_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Thumbnail resolution (overrides THUMBNAIL_DPI)
    #[arg(long)]
    thumbnail_dpi: Option<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "folio_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dpi) = args.thumbnail_dpi.filter(|dpi| dpi.is_finite() && *dpi > 0.0) {
        config.render.thumbnail_dpi = dpi;
    }

    tracing::info!("Starting Folio Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Thumbnails at {} DPI ({:?}), full size at {} DPI",
        config.render.thumbnail_dpi,
        config.render.thumbnail_format,
        config.render.full_size_dpi
    );

    let encoder = ImageCrateEncoder::new(config.render.thumbnail_format);
    let app_state = AppState::new(
        config.clone(),
        Arc::new(MupdfEngine::new()),
        Arc::new(encoder),
    );

    // Open command-line documents; a bad file is logged and skipped
    for path in &args.files {
        match app_state.session().add_document_from_path(path) {
            Ok(id) => tracing::info!("Opened {} as document {}", path.display(), id),
            Err(e) => tracing::error!("Skipping {}: {}", path.display(), e),
        }
    }

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Folio Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
