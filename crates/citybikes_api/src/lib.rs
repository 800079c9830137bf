//! Citybikes HTTP API
//!
//! Serves the bike-rental station vector tiles produced by `citybikes_engine`.

mod app_state;
mod config;
mod tiles;

pub use crate::app_state::AppState;
pub use crate::config::{DEFAULT_PORT, ServerConfig};
pub use crate::tiles::{ErrorResponse, PROTOBUF_CONTENT_TYPE};

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(tiles::get_info))
        .route("/tiles/{z}/{x}/{y}", get(tiles::get_tile))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
