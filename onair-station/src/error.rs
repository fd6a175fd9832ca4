//! Error types for onair-station
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! None of these are fatal to the producer loop: `QueueFull` is surfaced to the
//! enqueue caller, `TrackUnreadable` is logged and the producer advances.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for onair-station
#[derive(Error, Debug)]
pub enum Error {
    /// Priority schedule is at capacity
    #[error("Priority queue is full (max {capacity} tracks allowed)")]
    QueueFull {
        /// Configured priority capacity
        capacity: usize,
    },

    /// Track byte source could not be opened or read
    #[error("Track unreadable: {track}: {source}")]
    TrackUnreadable {
        /// Track reference
        track: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Remote media conversion errors
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Conversion worker cannot accept more jobs
    #[error("Conversion queue is full")]
    ConversionBusy,

    /// Remote storage synchronization errors
    #[error("Storage sync error: {0}")]
    StorageSync(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors from the common library
    #[error(transparent)]
    Common(#[from] onair_common::Error),
}

/// Convenience Result type using onair-station Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status used when this error reaches an API handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::QueueFull { .. } => StatusCode::CONFLICT,
            Error::ConversionBusy => StatusCode::SERVICE_UNAVAILABLE,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "status": format!("error: {}", self) }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::QueueFull { capacity: 20 }.status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::ConversionBusy.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            Error::Conversion("ffmpeg".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_queue_full_message() {
        let err = Error::QueueFull { capacity: 20 };
        assert_eq!(err.to_string(), "Priority queue is full (max 20 tracks allowed)");
    }
}
