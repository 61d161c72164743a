//! API Routes

use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::time::Instant;

use crate::camera::Setting;
use crate::error::{Error, Result};
use crate::mjpeg;
use crate::state::AppState;

/// Router for the control port
pub fn control_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/capture", get(capture))
        .route("/status", get(status))
        .route("/control", get(control))
        .route("/sensors", get(sensors))
        .route("/healthz", get(super::health_check))
        .with_state(state)
}

/// Router for the stream port
pub fn stream_router(state: AppState) -> Router {
    Router::new()
        .route("/stream", get(stream))
        .with_state(state)
}

/// GET /
/// Dashboard page; a thin client over the JSON and image endpoints.
async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// GET /capture
/// One frame as a whole JPEG response.
async fn capture(State(state): State<AppState>) -> Result<Response> {
    let started = Instant::now();
    let quality = state.store.settings().await.quality;
    let jpeg = state.camera.capture_jpeg(quality).await?;

    tracing::debug!(
        bytes = jpeg.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Capture served"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=capture.jpg",
            ),
        ],
        jpeg,
    )
        .into_response())
}

/// GET /stream
/// Unbounded multipart/x-mixed-replace MJPEG stream; ends only when the
/// client closes the connection.
async fn stream(State(state): State<AppState>) -> Response {
    let body = mjpeg::stream_body(state.camera.clone(), state.store.clone());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mjpeg::content_type())
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// GET /status
/// Camera settings plus the sensor snapshot as one flat JSON object.
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let settings = state.store.settings().await;
    let snapshot = state.store.sensor_snapshot().await;

    Json(json!({
        "framesize": settings.frame_size as u8,
        "quality": settings.quality,
        "brightness": settings.brightness,
        "contrast": settings.contrast,
        "temperature": snapshot.temperature_c,
        "humidity": snapshot.humidity_pct,
        "soilMoisture": snapshot.soil_moisture_pct,
    }))
}

/// GET /sensors
/// Snapshot plus server timestamp; polled by the dashboard, so the
/// response must never be cached.
async fn sensors(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.store.sensor_snapshot().await;

    let body = Json(json!({
        "temperature": snapshot.temperature_c,
        "humidity": snapshot.humidity_pct,
        "soilMoisture": snapshot.soil_moisture_pct,
        "timestamp": chrono::Utc::now().timestamp_millis(),
        "status": if snapshot.valid { "ok" } else { "stale" },
    }));

    ([(header::CACHE_CONTROL, "no-cache")], body)
}

/// GET /control?var=X&val=Y
/// Applies one camera setting. A missing or unparseable query is 404;
/// an unknown setting name or refused value is 500; success is an
/// empty 200.
async fn control(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<StatusCode> {
    let query = query.ok_or(Error::MalformedRequest)?;
    let (var, val) = parse_control_query(&query).ok_or(Error::MalformedRequest)?;

    let setting =
        Setting::from_wire(&var).ok_or_else(|| Error::UnknownSetting(var.to_string()))?;
    let value: i32 = val.parse().map_err(|_| Error::MalformedRequest)?;

    state.store.apply_setting(setting, value).await?;
    Ok(StatusCode::OK)
}

/// Pull the two required keys out of the raw query string.
fn parse_control_query(query: &str) -> Option<(&str, &str)> {
    let mut var = None;
    let mut val = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("var", v)) if !v.is_empty() => var = Some(v),
            Some(("val", v)) if !v.is_empty() => val = Some(v),
            _ => {}
        }
    }
    Some((var?, val?))
}
