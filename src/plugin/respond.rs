//! Standardized response envelopes for plugin endpoints

use crate::plugin::types::PluginResponse;
use axum::http::StatusCode;
use serde_json::{json, Value};

/// Author string included in every success envelope
pub const AUTHOR: &str = "Ditzzy";

/// Note string included in every success envelope
pub const NOTE: &str = "Thank you for using this API!";

/// Standardized success response
pub fn success(data: Value) -> PluginResponse {
    success_with_status(StatusCode::OK, data, None)
}

/// Standardized success response with an extra message field
pub fn success_with_message(data: Value, message: &str) -> PluginResponse {
    success_with_status(StatusCode::OK, data, Some(message))
}

fn success_with_status(status: StatusCode, data: Value, message: Option<&str>) -> PluginResponse {
    let mut body = json!({
        "status": status.as_u16(),
        "author": AUTHOR,
        "note": NOTE,
        "results": data,
    });
    if let Some(message) = message {
        body["message"] = Value::String(message.to_string());
    }
    PluginResponse::json(status, body)
}

/// Standardized error response
pub fn error(status: StatusCode, message: &str) -> PluginResponse {
    PluginResponse::json(
        status,
        json!({
            "status": status.as_u16(),
            "message": message,
        }),
    )
}

/// Standardized error response carrying upstream error detail
pub fn error_with_detail(status: StatusCode, message: &str, detail: &str) -> PluginResponse {
    PluginResponse::json(
        status,
        json!({
            "status": status.as_u16(),
            "message": message,
            "error": detail,
        }),
    )
}

pub fn bad_request(message: &str) -> PluginResponse {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn invalid_url(message: &str) -> PluginResponse {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn missing_parameter(param: &str) -> PluginResponse {
    error(
        StatusCode::BAD_REQUEST,
        &format!("Missing required parameter: {}", param),
    )
}

pub fn invalid_parameter(param: &str, reason: &str) -> PluginResponse {
    error(
        StatusCode::BAD_REQUEST,
        &format!("Invalid parameter: {} - {}", param, reason),
    )
}

pub fn not_found(message: &str) -> PluginResponse {
    error(StatusCode::NOT_FOUND, message)
}

pub fn server_error() -> PluginResponse {
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "An error occurred, please try again later.",
    )
}

pub fn service_unavailable() -> PluginResponse {
    error(
        StatusCode::SERVICE_UNAVAILABLE,
        "Service temporarily unavailable",
    )
}
