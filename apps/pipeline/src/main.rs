mod classification;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod scraper;
mod state;
mod store;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::classification::build_capabilities;
use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, run_migrations};
use crate::pipeline::engine::JobPipeline;
use crate::pipeline::ingestion::IngestionRunner;
use crate::pipeline::prefilter::PostingFilter;
use crate::routes::build_router;
use crate::scraper::http::HttpPostingSource;
use crate::state::AppState;
use crate::store::memory::MemoryJobStore;
use crate::store::postgres::PgJobStore;
use crate::store::JobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job pipeline v{}", env!("CARGO_PKG_VERSION"));

    // Job store; the pool handle is kept so it can be closed on shutdown
    let pool = match config.store {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres job store")?;
            let pool = create_pool(url, config.database_max_connections).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            Some(pool)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory job store; stored jobs are lost on exit");
            None
        }
    };
    let store: Arc<dyn JobStore> = match &pool {
        Some(pool) => Arc::new(PgJobStore::new(pool.clone())),
        None => Arc::new(MemoryJobStore::new()),
    };

    // Classification backend (always / keyword / llm)
    let capabilities = build_capabilities(&config.classifier)?;

    let pipeline = Arc::new(
        JobPipeline::new(
            PostingFilter::new(config.filter.clone()),
            capabilities,
            store.clone(),
        )
        .with_rejection_recording(config.record_rejections),
    );

    let source = Arc::new(HttpPostingSource::new(
        config.scraper.url.clone(),
        config.scraper.source.clone(),
    ));
    let runner = Arc::new(
        IngestionRunner::new(source, pipeline.clone(), store.clone(), config.scraper.source.clone())
            .with_url_lookback(Some(chrono::Duration::days(config.scraper.url_lookback_days)))
            .with_concurrency(config.pipeline_concurrency),
    );
    info!(
        scraper = %config.scraper.url,
        source = %config.scraper.source,
        concurrency = config.pipeline_concurrency,
        "Ingestion runner initialized"
    );

    let state = AppState {
        store,
        pipeline,
        runner,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
        info!("PostgreSQL connection pool closed");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
