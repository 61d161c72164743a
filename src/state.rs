//! Application state
//!
//! Holds all shared components and state

use crate::camera::CameraService;
use crate::device_state::DeviceStateStore;
use std::sync::Arc;
use std::time::Instant;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host
    pub host: String,
    /// Control port; the stream listener binds one port above
    pub port: u16,
    /// Sensor sampling interval in seconds
    pub sensor_interval_secs: u64,
    /// Cap on a single sensor read in seconds
    pub sensor_read_timeout_secs: u64,
}

impl AppConfig {
    /// Port the MJPEG stream listener binds.
    pub fn stream_port(&self) -> u16 {
        self.port + 1
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(80),
            sensor_interval_secs: std::env::var("SENSOR_INTERVAL_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            sensor_read_timeout_secs: std::env::var("SENSOR_READ_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Camera front (exclusive acquisition + JPEG conversion)
    pub camera: Arc<CameraService>,
    /// Device State Store (settings + sensor snapshot)
    pub store: Arc<DeviceStateStore>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, camera: Arc<CameraService>, store: Arc<DeviceStateStore>) -> Self {
        Self {
            config,
            camera,
            store,
            started_at: Instant::now(),
        }
    }
}
