//! KV Cache Server - A key-value service with a sharded LRU cache
//!
//! Serves `/api/data` over HTTP, backed by SQLite through a connection pool.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_cache_server::{api::create_router, logging, AppState, Config};

/// Main entry point for the key-value server.
///
/// # Startup Sequence
/// 1. Load configuration from environment variables
/// 2. Initialize tracing (console, plus a log file when `LOG_DIR` is set), then validate
/// 3. Open the backing store, fill the connection pool, build the cache
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured address
/// 6. On SIGINT/SIGTERM, drain requests and close the pool
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    let (log_path, file_layer) = match config.log_dir.as_deref() {
        Some(dir) => {
            let (path, file) = logging::open_log_file(dir)
                .with_context(|| format!("failed to open log file in {}", dir))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file));
            (Some(path), Some(layer))
        }
        None => (None, None),
    };

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_cache_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    info!("Starting KV Cache Server");
    if let Some(path) = &log_path {
        info!("Logging to {}", path.display());
    }

    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: cache_capacity={}, shards={}, pool_size={}, acquire_timeout_ms={:?}, database={}",
        config.cache_capacity,
        config.cache_shards,
        config.pool_size,
        config.acquire_timeout_ms,
        config.database_path
    );

    let state = AppState::from_config(&config).context("failed to initialize cache coordinator")?;
    let coordinator = Arc::clone(&state.coordinator);
    info!("Cache coordinator initialized");

    let app = create_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    match Arc::try_unwrap(coordinator) {
        Ok(coordinator) => {
            let closed = coordinator.shutdown();
            info!(closed, "Store connections closed");
        }
        Err(_) => warn!("Coordinator still referenced at shutdown, leaving pool to drop"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
