//! Dashboard server binary
//!
//! Loads the incident dataset, then serves the query API. A missing or
//! unparseable dataset is fatal: the dashboard has no degraded mode.

use anyhow::Context;
use interference_dashboard::{config::Config, create_router, dataset, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interference_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!(
        environment = %config.environment,
        "Interference Tracker dashboard starting..."
    );

    let dataset = dataset::load(&config.dataset_path)
        .with_context(|| format!("failed to load dataset from {}", config.dataset_path))?;
    tracing::info!(
        incidents = dataset.incidents.len(),
        countries = dataset.countries.len(),
        "Dataset loaded"
    );

    let state = AppState {
        dataset: Arc::new(dataset),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server exited")?;

    Ok(())
}
