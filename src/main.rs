use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edubit_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, create_redis_client, Cache, CacheWriterHandle, MemoryStore, PgStore, Store},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env()?;
    if config.uses_default_jwt_secret() {
        tracing::warn!("JWT_SECRET is not set; tokens are signed with the development secret");
    }

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            let pool = create_pool(url).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            tracing::info!("Connected to PostgreSQL");
            Arc::new(store)
        }
        _ => {
            tracing::warn!("DATABASE_URL is not set; data is kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let (cache, cache_writer) = match connect_cache(&config) {
        Some((cache, handle)) => (Some(cache), Some(handle)),
        None => (None, None),
    };

    let state = AppState::from_config(store, &config, cache);
    tracing::info!(
        ai = state.ai.is_enabled(),
        media = state.media.is_enabled(),
        "Collaborators configured"
    );

    let app = create_router(state, &config.cors_origins, config.max_upload_bytes);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edubit_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Redis is optional; without it generated AI content is not cached
fn connect_cache(config: &Config) -> Option<(Cache, CacheWriterHandle)> {
    let url = config.redis_url.as_deref().filter(|url| !url.trim().is_empty())?;
    match create_redis_client(url) {
        Ok(client) => {
            tracing::info!("AI result caching enabled");
            Some(Cache::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable; AI results will not be cached");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
