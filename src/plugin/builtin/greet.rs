//! Welcome endpoint

use crate::core::error::Result;
use crate::plugin::types::{PluginExec, PluginRequest, PluginResponse};
use axum::http::StatusCode;
use serde_json::json;

/// Greets the caller and points at the documentation site
pub struct Greet;

#[async_trait::async_trait]
impl PluginExec for Greet {
    async fn exec(&self, _req: PluginRequest) -> Result<PluginResponse> {
        Ok(PluginResponse::json(
            StatusCode::OK,
            json!({
                "status": 200,
                "message": "Welcome to DitzzyAPI, Lets get started by visit our documentation on: https://api.ditzzy.my.id/docs",
            }),
        ))
    }
}
