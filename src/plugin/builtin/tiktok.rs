//! TikTok downloader endpoint
//!
//! Proxies the tikwm.com resolver: the caller supplies a TikTok video URL and
//! gets back the resolved media links (plain, watermarked, HD) and metadata.

use crate::core::error::Result;
use crate::plugin::builtin::read_json_capped;
use crate::plugin::respond;
use crate::plugin::types::{PluginExec, PluginRequest, PluginResponse};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::error;

const TIKWM_API_URL: &str = "https://tikwm.com/api/";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/116.0.0.0 Mobile Safari/537.36";

lazy_static! {
    static ref TIKTOK_URL_RE: Regex =
        Regex::new(r"(?i)^https?://(www\.|vm\.|vt\.)?tiktok\.com/.+").expect("valid pattern");
}

pub struct TikTokDownloader {
    client: Arc<reqwest::Client>,
    max_response_bytes: usize,
}

impl TikTokDownloader {
    pub fn new(client: Arc<reqwest::Client>, max_response_bytes: usize) -> Self {
        Self {
            client,
            max_response_bytes,
        }
    }

    async fn fetch_video(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(TIKWM_API_URL)
            .header("Cookie", "current_language=en")
            .header("User-Agent", MOBILE_USER_AGENT)
            .form(&[("url", url), ("hd", "1")])
            .send()
            .await?;

        let payload = read_json_capped(response, self.max_response_bytes).await?;

        match payload.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(crate::core::error::ApiError::UpstreamError(
                "Invalid response from TikTok API".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl PluginExec for TikTokDownloader {
    async fn exec(&self, req: PluginRequest) -> Result<PluginResponse> {
        let Some(url) = req.query_param("url") else {
            return Ok(respond::missing_parameter("url"));
        };

        if !TIKTOK_URL_RE.is_match(url) {
            return Ok(respond::invalid_url(
                "Invalid URL - must be a valid TikTok URL",
            ));
        }

        match self.fetch_video(url).await {
            Ok(data) => Ok(respond::success(data)),
            Err(e) => {
                error!(error = %e, "TikTok download error");
                Ok(respond::server_error())
            }
        }
    }
}
