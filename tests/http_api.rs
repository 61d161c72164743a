//! Control-port endpoint tests, driven through the router with tower.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use plantcam::camera::synthetic::SyntheticCamera;
use plantcam::camera::{CameraService, ImageJpegEncoder};
use plantcam::device_state::DeviceStateStore;
use plantcam::sensors::{SensorReading, SensorSnapshot};
use plantcam::state::{AppConfig, AppState};
use plantcam::web_api;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};

fn make_state() -> (Arc<SyntheticCamera>, AppState) {
    let driver = Arc::new(SyntheticCamera::new());
    let camera = Arc::new(CameraService::new(
        driver.clone(),
        Arc::new(ImageJpegEncoder),
    ));
    let store = Arc::new(DeviceStateStore::new(driver.clone()));
    (driver, AppState::new(AppConfig::default(), camera, store))
}

async fn get(state: &AppState, uri: &str) -> axum::response::Response {
    web_api::control_router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn index_serves_html() {
    let (_, state) = make_state();
    let response = get(&state, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (_, state) = make_state();
    let response = get(&state, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn capture_returns_one_jpeg() {
    let (driver, state) = make_state();

    let response = get(&state, "/capture").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=capture.jpg"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[0..2], &[0xff, 0xd8]);
    assert_eq!(driver.outstanding_frames(), 0);
}

#[tokio::test]
async fn capture_failure_is_500_and_leaks_nothing() {
    let (driver, state) = make_state();

    driver.fail_next_acquire();
    let response = get(&state, "/capture").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(driver.outstanding_frames(), 0);

    // The failure was contained to that request.
    let response = get(&state, "/capture").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_reports_settings_and_sensors() {
    let (_, state) = make_state();
    state
        .store
        .set_sensor_snapshot(SensorSnapshot::from_reading(
            &SensorReading {
                temperature_c: 23.5,
                humidity_pct: 51.0,
                soil_moisture_pct: 62,
            },
            1000,
        ))
        .await;

    let body = json_body(get(&state, "/status").await).await;
    assert_eq!(body["framesize"], 5);
    assert_eq!(body["quality"], 10);
    assert_eq!(body["brightness"], 0);
    assert_eq!(body["contrast"], 0);
    assert_eq!(body["temperature"], 23.5);
    assert_eq!(body["humidity"], 51.0);
    assert_eq!(body["soilMoisture"], 62);
}

#[tokio::test]
async fn sensors_endpoint_is_fresh_and_uncached() {
    let (_, state) = make_state();

    let response = get(&state, "/sensors").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    let body = json_body(response).await;
    // No sampler has run yet; the default snapshot is stale.
    assert_eq!(body["status"], "stale");
    assert!(body["timestamp"].as_i64().unwrap() > 0);

    state
        .store
        .set_sensor_snapshot(SensorSnapshot::from_reading(
            &SensorReading {
                temperature_c: 23.5,
                humidity_pct: 51.0,
                soil_moisture_pct: 62,
            },
            1000,
        ))
        .await;

    let body = json_body(get(&state, "/sensors").await).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["temperature"], 23.5);
}

#[tokio::test]
async fn control_applies_setting_with_empty_200() {
    let (_, state) = make_state();

    let response = get(&state, "/control?var=quality&val=30").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());

    let body = json_body(get(&state, "/status").await).await;
    assert_eq!(body["quality"], 30);
}

#[tokio::test]
async fn control_without_query_is_404() {
    let (_, state) = make_state();
    let response = get(&state, "/control").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn control_with_missing_key_is_404() {
    let (_, state) = make_state();
    assert_eq!(
        get(&state, "/control?var=quality").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&state, "/control?val=10").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&state, "/control?var=quality&val=ten").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn control_with_unknown_setting_is_500() {
    // Distinct from the malformed-query 404.
    let (_, state) = make_state();
    let response = get(&state, "/control?var=bogus&val=1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn control_below_quality_floor_is_500_and_keeps_prior_value() {
    let (_, state) = make_state();

    let response = get(&state, "/control?var=quality&val=5").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(get(&state, "/status").await).await;
    assert_eq!(body["quality"], 10);
}

#[tokio::test]
async fn control_drives_flash_output() {
    let (driver, state) = make_state();
    let response = get(&state, "/control?var=flash&val=180").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(driver.flash_output(), 180);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let (_, state) = make_state();
    let app = web_api::control_router(state).layer(
        CorsLayer::new().allow_origin(Any).allow_methods(Any),
    );

    let response = app
        .oneshot(
            Request::get("/sensors")
                .header(header::ORIGIN, "http://dashboard.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
