//! Request handlers

pub mod config;
pub mod health;
pub mod incidents;
pub mod meta;

use axum::http::Uri;

use crate::AppError;

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
