//! WebAPI - HTTP endpoints
//!
//! ## Responsibilities
//!
//! - Control-port routes: index, capture, status, control, sensors, healthz
//! - Stream-port routes: the MJPEG stream
//! - Request validation and response formatting

mod routes;

pub use routes::{control_router, stream_router};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_sec": state.started_at.elapsed().as_secs(),
    }))
}
