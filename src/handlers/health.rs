//! Health check handler
//!
//! Liveness plus a glance at the loaded dataset, since a dashboard that
//! lost its dataset has nothing to serve.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    /// Visible incidents currently served
    incidents: usize,
    /// Distinct countries in the dataset
    countries: usize,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "serving",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        incidents: state.dataset.visible().count(),
        countries: state.dataset.countries.len(),
    })
}
