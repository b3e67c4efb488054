//! Plugin route dispatch
//!
//! The wildcard `/api/{*path}` handler: turns the raw HTTP request into a
//! [`PluginRequest`] and hands it to the loader, which resolves the route
//! against the current snapshot and applies the disabled/deprecated/error
//! wrapping.

use crate::plugin::types::PluginRequest;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;

use super::AppState;

/// Maximum accepted request body size
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Handler for any method on /api/{*path} - dispatch to the matching plugin
pub async fn dispatch_plugin(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let full_path = parts.uri.path().to_string();
    let endpoint = full_path
        .strip_prefix("/api")
        .unwrap_or(full_path.as_str())
        .to_string();

    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "message": "Request body too large",
                })),
            )
                .into_response();
        }
    };

    let body_json = if bytes.is_empty() {
        None
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "message": format!("Invalid JSON body: {}", e),
                    })),
                )
                    .into_response();
            }
        }
    };

    let plugin_request = PluginRequest {
        endpoint: endpoint.clone(),
        query,
        headers: parts.headers,
        body: body_json,
    };

    state
        .loader
        .dispatch(&parts.method, &endpoint, plugin_request)
        .await
}

/// Fallback for anything the router does not match
pub async fn not_found(request: Request) -> Response {
    let path = request.uri().path().to_string();
    if path.starts_with("/api") {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "message": "API endpoint not found",
                "path": path,
            })),
        )
            .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
