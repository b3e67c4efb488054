//! Error type system for the DitzzyAPI backend
//!
//! This module provides the error types shared across the core with:
//! - HTTP status code mapping
//! - Structured JSON error responses with trace IDs
//! - Axum `IntoResponse` integration

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Main error type for the DitzzyAPI backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // System-level errors
    #[error("System initialization failed: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Plugin-related errors
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin load failed: {0}")]
    PluginLoadError(String),

    #[error("Plugin execution error: {0}")]
    PluginExecutionError(String),

    #[error("Invalid plugin manifest: {0}")]
    ManifestError(String),

    // API-related errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    // Upstream calls made by plugins
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Upstream request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    // Persistence
    #[error("Stats persistence error: {0}")]
    PersistenceError(String),

    // I/O and serialization
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,

            ApiError::NotFound(_) | ApiError::PluginNotFound(_) => StatusCode::NOT_FOUND,

            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            ApiError::InitializationError(_)
            | ApiError::ConfigError(_)
            | ApiError::PluginLoadError(_)
            | ApiError::PluginExecutionError(_)
            | ApiError::ManifestError(_)
            | ApiError::UpstreamError(_)
            | ApiError::HttpError(_)
            | ApiError::PersistenceError(_)
            | ApiError::IoError(_)
            | ApiError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InitializationError(_) => "InitializationError",
            ApiError::ConfigError(_) => "ConfigError",
            ApiError::PluginNotFound(_) => "PluginNotFound",
            ApiError::PluginLoadError(_) => "PluginLoadError",
            ApiError::PluginExecutionError(_) => "PluginExecutionError",
            ApiError::ManifestError(_) => "ManifestError",
            ApiError::InvalidRequest(_) => "InvalidRequest",
            ApiError::NotFound(_) => "NotFound",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
            ApiError::UpstreamError(_) => "UpstreamError",
            ApiError::HttpError(_) => "HttpError",
            ApiError::PersistenceError(_) => "PersistenceError",
            ApiError::IoError(_) => "IoError",
            ApiError::SerializationError(_) => "SerializationError",
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response with a generated trace ID
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an error response from an ApiError
    pub fn from_error(error: &ApiError) -> Self {
        Self::new(error.error_type().to_string(), error.to_string())
    }
}

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        tracing::error!(
            error_type = self.error_type(),
            trace_id = %error_response.trace_id,
            status_code = %status_code,
            "Request failed: {}",
            self
        );

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
