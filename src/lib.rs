//! Authoritarian Interference Tracker - Dashboard API
//!
//! Read-only dashboard backend over a static incident dataset.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 INTERFERENCE DASHBOARD                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │  API      │  │  Filter /    │  │  Cross-Filter State   │  │
//! │  │  Gateway  │  │  Aggregation │  │  Machine              │  │
//! │  │  (Axum)   │  │  Engine      │  │  (client-resident)    │  │
//! │  └─────┬─────┘  └──────┬───────┘  └───────────────────────┘  │
//! │        └───────────────┘                                     │
//! │                ▼                                             │
//! │        ┌──────────────┐                                      │
//! │        │  In-memory   │  loaded once at startup,             │
//! │        │  Dataset     │  read-only afterwards                │
//! │        └──────────────┘                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dataset is immutable after load, so concurrent requests share it
//! through an `Arc` with no locking.

pub mod config;
pub mod crossfilter;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod palette;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::AppError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<dataset::Dataset>,
    pub config: config::Config,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/config", get(handlers::config::get))
        .route("/api/meta", get(handlers::meta::get))
        .route("/api/incidents", get(handlers::incidents::list))
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
