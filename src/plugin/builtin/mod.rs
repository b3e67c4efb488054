//! Built-in exec implementations
//!
//! Every endpoint the repository ships is implemented here and registered in
//! [`exec_table`]. Manifests under the plugin directory bind to these
//! implementations by name via their `handler` field; dropping a new manifest
//! that references an existing name adds a route without touching code.

pub mod greet;
pub mod terabox;
pub mod tiktok;

use crate::core::config::HttpClientConfig;
use crate::core::error::{ApiError, Result};
use crate::plugin::types::{ExecTable, PluginExec};
use serde_json::Value;
use std::sync::Arc;

pub use greet::Greet;
pub use terabox::TeraboxDownloader;
pub use tiktok::TikTokDownloader;

/// Build the startup-time table of exec implementations
pub fn exec_table(client: Arc<reqwest::Client>, http: &HttpClientConfig) -> ExecTable {
    let mut table = ExecTable::new();
    table.insert(
        "greet".to_string(),
        Arc::new(Greet) as Arc<dyn PluginExec>,
    );
    table.insert(
        "tiktok_downloader".to_string(),
        Arc::new(TikTokDownloader::new(
            client.clone(),
            http.max_response_bytes,
        )) as Arc<dyn PluginExec>,
    );
    table.insert(
        "terabox_downloader".to_string(),
        Arc::new(TeraboxDownloader::new(client, http.max_response_bytes))
            as Arc<dyn PluginExec>,
    );
    table
}

/// Read an upstream JSON body, enforcing the configured size cap
pub(crate) async fn read_json_capped(
    response: reqwest::Response,
    max_bytes: usize,
) -> Result<Value> {
    if let Some(length) = response.content_length() {
        if length as usize > max_bytes {
            return Err(ApiError::UpstreamError(format!(
                "response too large: {} bytes",
                length
            )));
        }
    }

    let bytes = response.bytes().await?;
    if bytes.len() > max_bytes {
        return Err(ApiError::UpstreamError(format!(
            "response too large: {} bytes",
            bytes.len()
        )));
    }

    serde_json::from_slice(&bytes).map_err(ApiError::from)
}
