//! Courier API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courier_common::config::AppConfig;
use courier_common::db::{create_pool, run_migrations};
use courier_notifier::store::{MemoryStore, NotificationStore, PgNotificationStore};

use courier_api::routes::create_router;
use courier_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("courier_api=debug,courier_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Courier API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Open the notification store
    let store: Arc<dyn NotificationStore> = if config.database_url.starts_with("memory:") {
        tracing::warn!("Using volatile in-memory store; notifications are lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let pool = create_pool(&config.database_url, config.db_max_connections).await?;
        run_migrations(&pool).await?;
        Arc::new(PgNotificationStore::new(pool))
    };

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|_| anyhow::anyhow!("BIND_ADDR must be a socket address, got {}", config.bind_addr))?;

    // Build application state
    let state = AppState::new(store, config);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    Ok(())
}
