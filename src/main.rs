//! SwipeFeed Engine
//!
//! Serves a swipe-based post feed: each user sees posts they did not write
//! and have not yet swiped on, optionally narrowed to a set of categories.
//!
//! # Architecture
//!
//! - **Stores**: PostgreSQL (default) or in-process memory
//! - **Feed Engine / Swipe Recorder**: the core, behind storage traits
//! - **API Server**: REST endpoints for frontend consumption
//!
//! # Graceful Shutdown
//!
//! The engine handles SIGTERM and SIGINT signals, ensuring:
//! - In-flight requests complete
//! - Database connections are closed cleanly

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swipefeed::api::{self, AppState};
use swipefeed::config::{Config, StorageBackend};
use swipefeed::database::Database;
use swipefeed::store::{InMemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with structured logging
    init_tracing();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  🚀 SwipeFeed Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");
    info!("  Components:");
    info!("    • Feed Engine");
    info!("    • Swipe Recorder");
    info!("    • REST API Server");
    info!("═══════════════════════════════════════════════════════════════");

    // Load configuration
    let config = Arc::new(Config::from_env().context("failed to load configuration")?);
    info!("✅ Configuration loaded and validated");

    #[cfg(feature = "metrics")]
    install_metrics_exporter(config.feed.metrics_port);

    let (state, db) = match config.feed.storage_backend {
        StorageBackend::Postgres => {
            // Initialize database connection pool
            let db = Database::connect_with_retry(&config.database, 5, Duration::from_millis(500))
                .await
                .context("failed to connect to PostgreSQL")?;
            info!("✅ Database connection pool established");

            // Run migrations
            info!("📦 Running database migrations...");
            db.migrate().await.context("failed to apply migrations")?;
            info!("✅ Database migrations applied");

            let store = Arc::new(PgStore::new(db.clone()));
            let state = AppState::new(store.clone(), store.clone(), store).with_database(db.clone());
            (state, Some(db))
        }
        StorageBackend::Memory => {
            warn!("⚠️ Using in-memory storage; all data is lost on exit");
            let store = Arc::new(InMemoryStore::new());
            (AppState::new(store.clone(), store.clone(), store), None)
        }
    };
    let state = Arc::new(state.with_feed_config(&config.feed));

    info!("═══════════════════════════════════════════════════════════════");
    info!("  ✅ All services started successfully");
    info!("  📡 API: http://{}:{}", config.api.host, config.api.port);
    info!(
        "  🔗 Health: http://{}:{}/health",
        config.api.host, config.api.port
    );
    info!("═══════════════════════════════════════════════════════════════");

    let served = api::start_server(state, &config.api, shutdown_signal()).await;

    // Cleanup resources
    info!("🛑 Initiating graceful shutdown...");
    if let Some(db) = db {
        db.close().await;
    }

    if let Err(e) = &served {
        error!("API server error: {:?}", e);
    }
    served.context("API server failed")?;

    info!("👋 SwipeFeed Engine stopped gracefully");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Default log levels
        EnvFilter::new("swipefeed=debug,swipefeed_engine=debug,tower_http=debug,sqlx=warn,info")
    });

    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(std::env::var("NO_COLOR").is_err()),
            )
            .init();
    }
}

/// Expose metrics on a Prometheus scrape endpoint
#[cfg(feature = "metrics")]
fn install_metrics_exporter(port: u16) {
    use metrics_exporter_prometheus::PrometheusBuilder;

    match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
    {
        Ok(()) => info!("📊 Prometheus metrics on port {}", port),
        Err(e) => warn!("⚠️ Failed to install Prometheus exporter: {}", e),
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("📴 Shutdown signal received");
}
