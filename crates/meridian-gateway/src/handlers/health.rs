//! Version and liveness endpoints
//!
//! GET /_/version - gateway version, plain text
//! GET /_/health  - liveness probe

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Version reported to peers probing this gateway during a pull.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /_/version
pub async fn version() -> impl IntoResponse {
    GATEWAY_VERSION
}

/// GET /_/health
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "meridian-gateway" })),
    )
}

/// Build the health router sub-tree
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/_/version", get(version))
        .route("/_/health", get(health))
}
