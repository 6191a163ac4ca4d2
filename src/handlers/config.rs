//! Static display configuration
//!
//! Serves the color tokens and palettes so the client can reproduce the
//! deterministic actor/tool color assignment locally. No parameters.

use axum::Json;

use crate::palette::{self, PaletteConfig};

pub async fn get() -> Json<PaletteConfig> {
    Json(palette::config())
}
