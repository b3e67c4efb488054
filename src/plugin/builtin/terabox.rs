//! Terabox downloader endpoint
//!
//! Resolves Terabox share links through the terabxdownloader.org fetch
//! endpoint. The shipped manifest marks this plugin disabled while the
//! upstream resolver is unstable; the implementation stays registered so the
//! route can be re-enabled from the manifest alone.

use crate::core::error::Result;
use crate::plugin::builtin::read_json_capped;
use crate::plugin::respond;
use crate::plugin::types::{PluginExec, PluginRequest, PluginResponse};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::error;

const FETCH_URL: &str = "https://terabxdownloader.org/wp-admin/admin-ajax.php";

lazy_static! {
    static ref TERABOX_URL_RE: Regex = Regex::new(
        r"(?i)^(https?://)?(www\.)?(terabox\.com|teraboxapp\.com|1024tera\.com|1024terabox\.com|terabox\.app|nephobox\.com)/(s/|sharing/embed\?surl=)[\w-]+"
    )
    .expect("valid pattern");
}

pub struct TeraboxDownloader {
    client: Arc<reqwest::Client>,
    max_response_bytes: usize,
}

impl TeraboxDownloader {
    pub fn new(client: Arc<reqwest::Client>, max_response_bytes: usize) -> Self {
        Self {
            client,
            max_response_bytes,
        }
    }

    async fn fetch_share(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(FETCH_URL)
            .header("Referer", "https://terabxdownloader.org/")
            .form(&[("action", "terabox_fetch"), ("url", url)])
            .send()
            .await?;

        read_json_capped(response, self.max_response_bytes).await
    }
}

#[async_trait::async_trait]
impl PluginExec for TeraboxDownloader {
    async fn exec(&self, req: PluginRequest) -> Result<PluginResponse> {
        let Some(url) = req.query_param("url") else {
            return Ok(respond::missing_parameter("url"));
        };

        if !TERABOX_URL_RE.is_match(url) {
            return Ok(respond::invalid_url(
                "Invalid URL - must be a valid Terabox share URL",
            ));
        }

        match self.fetch_share(url).await {
            Ok(data) => Ok(respond::success(data)),
            Err(e) => {
                error!(error = %e, "Terabox download error");
                Ok(respond::server_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use std::collections::HashMap;

    #[test]
    fn test_url_pattern() {
        assert!(TERABOX_URL_RE.is_match("https://1024terabox.com/s/1hTspAuZCdy5vDAPiUOn3ig"));
        assert!(TERABOX_URL_RE.is_match("https://www.terabox.com/s/abc-DEF_123"));
        assert!(TERABOX_URL_RE.is_match("terabox.app/sharing/embed?surl=abc123"));
        assert!(!TERABOX_URL_RE.is_match("https://example.com/s/abc"));
    }

    #[tokio::test]
    async fn test_missing_url_parameter() {
        let downloader =
            TeraboxDownloader::new(Arc::new(reqwest::Client::new()), 5 * 1024 * 1024);
        let response = downloader
            .exec(PluginRequest {
                endpoint: "/downloader/terabox".to_string(),
                query: HashMap::new(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}
