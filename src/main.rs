mod api_doc;
mod app;
mod config;
mod error;
mod geocode;
mod handlers;
mod ledger;
mod models;
mod objects;
mod policy;
mod routes;
mod state;
mod store;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::{Config, StoreBackend};
use geocode::MapboxGeocoder;
use ledger::Ledger;
use objects::LocalObjectStore;
use state::AppState;
use store::{KvStore, MemoryStore, SpannerClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("intake_ledger=info,tower_http=info")),
        )
        .init();

    tracing::info!("intake-ledger starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store: Arc<dyn KvStore> = match &config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, records are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Spanner(spanner) => Arc::new(SpannerClient::from_config(spanner).await?),
    };
    let geocoder = Arc::new(MapboxGeocoder::from_config(&config.geocoder)?);
    let objects = Arc::new(LocalObjectStore::from_config(&config.upload));

    let state = AppState {
        ledger: Ledger::new(store, geocoder, config.list_page_size),
        objects,
        config: Arc::new(config.clone()),
    };
    let app = app::build_router(state);

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("intake-ledger stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
