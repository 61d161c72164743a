//! Error handling for the plantcam server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera hardware produced no frame
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// JPEG conversion failed
    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    /// Control request named a setting outside the fixed table
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// Setting value outside its valid range
    #[error("Invalid value for {setting}: {value}")]
    InvalidValue { setting: &'static str, value: i32 },

    /// Camera driver refused the value
    #[error("Device rejected {setting}={value}")]
    DeviceRejected { setting: &'static str, value: i32 },

    /// Required query parameters missing or unparseable
    #[error("Malformed request")]
    MalformedRequest,

    /// Sensor driver read failed; recovered locally, never sent to clients
    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            // Matches the source device: a bad control query gets a bare 404.
            Error::MalformedRequest => {
                tracing::warn!("Malformed control request");
                return StatusCode::NOT_FOUND.into_response();
            }
            Error::CaptureUnavailable(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CAPTURE_UNAVAILABLE",
                msg.clone(),
            ),
            Error::EncodeFailure(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENCODE_FAILURE",
                msg.clone(),
            ),
            Error::UnknownSetting(name) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UNKNOWN_SETTING",
                name.clone(),
            ),
            Error::InvalidValue { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INVALID_VALUE",
                self.to_string(),
            ),
            Error::DeviceRejected { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DEVICE_REJECTED",
                self.to_string(),
            ),
            Error::SensorRead(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SENSOR_READ",
                msg.clone(),
            ),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
