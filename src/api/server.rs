//! HTTP Server implementation
//!
//! This module provides the HTTP server using the Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling with a final stats flush
//! - CORS support

use crate::api::handlers::{not_found, AppState};
use crate::api::routes::build_api_routes;
use crate::core::config::ServerConfig;
use crate::stats::StatsTracker;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
    stats: Arc<StatsTracker>,
}

impl ApiServer {
    /// Create a new API server over the given application state
    pub fn new(state: AppState) -> Self {
        let config = state.config.server.clone();
        let stats = state.stats.clone();
        let router = Self::build_router(state);

        Self {
            router,
            config,
            stats,
        }
    }

    /// Build the Axum router with all routes and middleware
    pub fn build_router(state: AppState) -> Router {
        let cors = Self::build_cors_layer(&state.config.security.allowed_origins);

        build_api_routes(state).fallback(not_found).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
    }

    /// Build CORS layer from allowed origins configuration
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        use tower_http::cors::Any;

        let cors = CorsLayer::new();

        if allowed_origins.contains(&"*".to_string()) {
            cors.allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<_> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            cors.allow_origin(origins).allow_methods(Any).allow_headers(Any)
        }
    }

    /// Start the HTTP server and listen for requests
    ///
    /// Blocks until a shutdown signal arrives, then flushes the stats tracker
    /// before returning.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        self.stats.shutdown().await;
        info!("HTTP server shut down gracefully");

        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, saving stats...");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, saving stats...");
        },
    }

    info!("Initiating graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::RateLimiter;
    use crate::core::config::Config;
    use crate::plugin::builtin;
    use crate::plugin::PluginLoader;
    use crate::stats::TrackerConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn write_manifest(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    async fn test_state(plugins_dir: &Path) -> AppState {
        let config = Arc::new(Config::default_config().unwrap());
        let client = Arc::new(reqwest::Client::new());
        let loader = Arc::new(PluginLoader::new(
            plugins_dir,
            builtin::exec_table(client, &config.http),
        ));
        loader.load().await.unwrap();

        AppState {
            loader,
            stats: StatsTracker::new(TrackerConfig::default()),
            limiter: Arc::new(RateLimiter::new(
                25,
                Duration::from_secs(60),
                Duration::from_secs(300),
            )),
            config,
        }
    }

    fn seed_manifests(dir: &Path) {
        write_manifest(
            dir,
            "downloader/tiktok.toml",
            r#"
name = "TikTok Downloader"
description = "Download videos or slide photos from TikTok URLs"
method = "GET"
category = ["downloader"]
alias = ["tiktok", "tt"]
tags = ["social-media", "video", "downloader"]
handler = "tiktok_downloader"
"#,
        );
        write_manifest(
            dir,
            "greet.toml",
            r#"
name = "Greet user"
description = ""
method = "GET"
category = []
alias = ["data"]
handler = "greet"
"#,
        );
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_plugins_shape() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app.oneshot(get_request("/api/plugins")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-RateLimit-Limit"));

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        // The undocumented greet handler is routable but hidden
        assert_eq!(body["count"], 1);
        assert_eq!(body["plugins"][0]["name"], "TikTok Downloader");
        assert_eq!(body["plugins"][0]["endpoint"], "/downloader/tiktok");
        assert_eq!(body["plugins"][0]["aliases"][1], "tt");
    }

    #[tokio::test]
    async fn test_plugins_by_category_filters() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app
            .clone()
            .oneshot(get_request("/api/plugins/category/downloader"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["category"], "downloader");
        assert_eq!(body["count"], 1);

        let response = app
            .oneshot(get_request("/api/plugins/category/anime"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_categories_counts() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app.oneshot(get_request("/api/categories")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["categories"][0]["name"], "downloader");
        assert_eq!(body["categories"][0]["count"], 1);
    }

    #[tokio::test]
    async fn test_stats_endpoint_shape() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app.oneshot(get_request("/api/stats")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["global"]["totalRequests"], 0);
        assert_eq!(body["stats"]["global"]["successRate"], "0.00");
        assert!(body["stats"]["topEndpoints"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_visitor_chart_days() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app
            .oneshot(get_request("/api/stats/visitors?days=7"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app.oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_api_route_structured_404() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app
            .oneshot(get_request("/api/does/not/exist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["message"], "API endpoint not found");
        assert_eq!(body["path"], "/api/does/not/exist");
    }

    #[tokio::test]
    async fn test_dispatch_and_tracking_end_to_end() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let state = test_state(dir.path()).await;
        let app = ApiServer::build_router(state.clone());

        // The undocumented greet handler is reachable under its alias
        let response = app.clone().oneshot(get_request("/api/data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("Welcome to DitzzyAPI"));

        // The call was recorded against the full request path
        let global = state.stats.global_stats().await;
        assert_eq!(global.total_requests, 1);
        assert_eq!(global.unique_visitors, 1);
        assert!(state.stats.endpoint_stats("/api/data").await.is_some());

        // Meta endpoints stay untracked
        app.oneshot(get_request("/api/plugins")).await.unwrap();
        assert_eq!(state.stats.global_stats().await.total_requests, 1);
    }

    #[tokio::test]
    async fn test_wrong_method_on_plugin_route_is_404() {
        let dir = TempDir::new().unwrap();
        seed_manifests(dir.path());
        let app = ApiServer::build_router(test_state(dir.path()).await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/data")
                    .header("X-Forwarded-For", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
