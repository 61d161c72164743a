//! Plantcam server library
//!
//! Camera-equipped device exposed as a small HTTP service: live MJPEG
//! stream, single-frame capture, sensor telemetry and runtime camera
//! control.
//!
//! ## Architecture
//!
//! 1. CameraService - exclusive frame acquisition + JPEG conversion
//! 2. DeviceStateStore - SSoT for camera settings and the sensor snapshot
//! 3. SensorSampler - periodic probe reads feeding the store
//! 4. mjpeg - multipart/x-mixed-replace stream encoding
//! 5. WebAPI - two routers (control port, stream port) over one state
//!
//! ## Design principles
//!
//! - The camera is a single exclusive resource; acquisition serializes
//! - Shared state lives behind the store's accessors, never raw globals
//! - Per-request errors are contained to their request or connection

pub mod camera;
pub mod device_state;
pub mod error;
pub mod mjpeg;
pub mod sensor_sampler;
pub mod sensors;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
