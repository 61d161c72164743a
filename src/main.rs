//! Plantcam server
//!
//! Main entry point: wires the synthetic hardware backends into the
//! camera service and state store, starts the sensor sampler, and serves
//! the control and stream routers on adjacent ports.

use plantcam::{
    camera::{synthetic::SyntheticCamera, CameraService, ImageJpegEncoder},
    device_state::DeviceStateStore,
    sensor_sampler::SensorSampler,
    sensors::SyntheticSensor,
    state::{AppConfig, AppState},
    web_api,
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plantcam=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting plantcam server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        control_port = config.port,
        stream_port = config.stream_port(),
        sensor_interval_secs = config.sensor_interval_secs,
        "Configuration loaded"
    );

    // Hardware seams; real drivers replace the synthetic backends here.
    let camera_driver = Arc::new(SyntheticCamera::new());
    let sensor_driver = Arc::new(SyntheticSensor::new());

    let camera = Arc::new(CameraService::new(
        camera_driver.clone(),
        Arc::new(ImageJpegEncoder),
    ));
    let store = Arc::new(DeviceStateStore::new(camera_driver));
    tracing::info!("CameraService and DeviceStateStore initialized");

    // Start the sensor sampler
    let sampler = Arc::new(
        SensorSampler::new(sensor_driver, store.clone())
            .with_interval(Duration::from_secs(config.sensor_interval_secs))
            .with_read_timeout(Duration::from_secs(config.sensor_read_timeout_secs)),
    );
    sampler.start();

    let state = AppState::new(config.clone(), camera, store);

    // Two front-ends over one shared state: control plus stream.
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    let control_app = web_api::control_router(state.clone())
        .layer(cors.clone())
        .layer(TraceLayer::new_for_http());
    let stream_app = web_api::stream_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let control_addr = format!("{}:{}", config.host, config.port);
    let stream_addr = format!("{}:{}", config.host, config.stream_port());

    let control_listener = tokio::net::TcpListener::bind(&control_addr).await?;
    tracing::info!("Control server listening on {}", control_addr);

    let stream_listener = tokio::net::TcpListener::bind(&stream_addr).await?;
    tracing::info!("Stream server listening on {}", stream_addr);

    tokio::try_join!(
        axum::serve(control_listener, control_app).into_future(),
        axum::serve(stream_listener, stream_app).into_future(),
    )?;

    Ok(())
}
