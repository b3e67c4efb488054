//! Plugin loader
//!
//! The loader turns a directory tree of TOML manifests into an immutable
//! [`LoadedPlugins`] snapshot and swaps it into service atomically. A reload
//! either produces a complete replacement snapshot or leaves the previous one
//! serving untouched; there is no failed terminal state.
//!
//! Manifest validation is per file: a manifest that fails to parse, declares
//! no alias, or binds a `handler` name with no exec implementation is skipped
//! with a warning and never aborts the scan.

use crate::core::error::{ApiError, Result};
use crate::plugin::registry::LoadedPlugins;
use crate::plugin::types::{ExecTable, HandlerDescriptor, PluginMetadata, PluginRequest};
use arc_swap::ArcSwap;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Directory-driven plugin loader with hot-reload support
pub struct PluginLoader {
    plugins_dir: PathBuf,
    exec_table: ExecTable,
    current: ArcSwap<LoadedPlugins>,
}

impl PluginLoader {
    /// Create a loader over the given manifest directory. Nothing is loaded
    /// until [`load`](Self::load) is called.
    pub fn new(plugins_dir: impl Into<PathBuf>, exec_table: ExecTable) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            exec_table,
            current: ArcSwap::from_pointee(LoadedPlugins::new()),
        }
    }

    /// Initial load. Fails when the plugin directory itself is unusable;
    /// individual bad manifests are skipped, never fatal.
    pub async fn load(&self) -> Result<usize> {
        let loaded = self.build()?;
        let count = loaded.handler_count();
        self.current.store(Arc::new(loaded));
        info!(plugins = count, "Loaded plugins");
        Ok(count)
    }

    /// Full reload pipeline: scan, validate, build a new snapshot, swap it in.
    ///
    /// On any scan failure the previous snapshot is kept serving and the
    /// error is logged; callers (file watcher, signal handler, tests) never
    /// see a partially applied reload.
    pub async fn reload(&self) -> bool {
        match self.build() {
            Ok(loaded) => {
                let count = loaded.handler_count();
                self.current.store(Arc::new(loaded));
                info!(plugins = count, "Successfully reloaded plugins");
                true
            }
            Err(e) => {
                error!(error = %e, "Error reloading plugins, keeping previous plugin configuration");
                false
            }
        }
    }

    fn build(&self) -> Result<LoadedPlugins> {
        if !self.plugins_dir.is_dir() {
            return Err(ApiError::PluginLoadError(format!(
                "plugin directory not found: {}",
                self.plugins_dir.display()
            )));
        }

        let mut loaded = LoadedPlugins::new();

        let walker = WalkDir::new(&self.plugins_dir)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                ApiError::PluginLoadError(format!(
                    "error scanning {}: {}",
                    self.plugins_dir.display(),
                    e
                ))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }

            self.load_manifest(entry.path(), &mut loaded);
        }

        Ok(loaded)
    }

    /// Load one manifest file into the snapshot under construction. Every
    /// failure mode skips the file with a warning.
    fn load_manifest(&self, path: &Path, loaded: &mut LoadedPlugins) {
        let file_name = path
            .strip_prefix(&self.plugins_dir)
            .unwrap_or(path)
            .display()
            .to_string();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Skipping plugin: unreadable manifest");
                return;
            }
        };

        let descriptor: HandlerDescriptor = match toml::from_str(&content) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Skipping plugin: invalid manifest");
                return;
            }
        };

        if descriptor.alias.is_empty() {
            warn!(file = %file_name, "Skipping plugin: missing 'alias' list");
            return;
        }

        let Some(exec) = self.exec_table.get(&descriptor.handler) else {
            warn!(
                file = %file_name,
                handler = %descriptor.handler,
                "Skipping plugin: no exec implementation bound to handler name"
            );
            return;
        };

        if descriptor.disabled {
            let reason = descriptor
                .disabled_reason
                .as_deref()
                .unwrap_or("This plugin has been disabled");
            info!(plugin = %descriptor.name, reason = reason, "Plugin is disabled");
        }
        if descriptor.deprecated {
            let reason = descriptor
                .deprecated_reason
                .as_deref()
                .unwrap_or("This plugin is deprecated and may be removed in future versions");
            warn!(plugin = %descriptor.name, reason = reason, "Plugin is deprecated");
        }

        for endpoint in descriptor.endpoints() {
            info!(
                method = %descriptor.method,
                endpoint = %endpoint,
                plugin = %descriptor.name,
                "Registered plugin route"
            );
        }

        loaded.register(descriptor, exec.clone());
    }

    /// Current snapshot of routes and registry
    pub fn snapshot(&self) -> Arc<LoadedPlugins> {
        self.current.load_full()
    }

    /// Ordered metadata of all documented handlers in the current snapshot
    pub fn metadata(&self) -> Vec<PluginMetadata> {
        self.snapshot().metadata()
    }

    /// Number of registered handlers in the current snapshot
    pub fn handler_count(&self) -> usize {
        self.snapshot().handler_count()
    }

    /// Dispatch a request to the matching plugin route.
    ///
    /// Disabled handlers short-circuit with 403 before their exec is ever
    /// invoked; deprecated handlers get warning headers attached; an exec
    /// error becomes a structured 500 naming the plugin.
    pub async fn dispatch(
        &self,
        method: &Method,
        endpoint: &str,
        request: PluginRequest,
    ) -> Response {
        let snapshot = self.snapshot();

        let Some(entry) = snapshot.route(method, endpoint) else {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "message": "API endpoint not found",
                    "path": format!("/api{}", endpoint),
                })),
            )
                .into_response();
        };

        let descriptor = &entry.descriptor;
        let plugin_name = if descriptor.name.trim().is_empty() {
            "unknown"
        } else {
            descriptor.name.as_str()
        };

        if descriptor.disabled {
            let reason = descriptor
                .disabled_reason
                .as_deref()
                .unwrap_or("This plugin has been disabled");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "success": false,
                    "message": "Plugin is disabled",
                    "reason": reason,
                    "plugin": plugin_name,
                })),
            )
                .into_response();
        }

        let deprecation_reason = descriptor.deprecated.then(|| {
            descriptor
                .deprecated_reason
                .clone()
                .unwrap_or_else(|| {
                    "This plugin is deprecated and may be removed in future versions".to_string()
                })
        });

        let mut response = match entry.exec.exec(request).await {
            Ok(plugin_response) => plugin_response.into_response(),
            Err(e) => {
                error!(plugin = plugin_name, error = %e, "Error in plugin");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Plugin execution error",
                        "plugin": plugin_name,
                        "error": e.to_string(),
                    })),
                )
                    .into_response()
            }
        };

        if let Some(reason) = deprecation_reason {
            let headers = response.headers_mut();
            headers.insert("X-Plugin-Deprecated", "true".parse().expect("static value"));
            if let Ok(value) = reason.parse() {
                headers.insert("X-Deprecation-Reason", value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::respond;
    use crate::plugin::types::{PluginExec, PluginResponse};
    use axum::http::HeaderMap;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingExec {
        calls: AtomicUsize,
    }

    impl CountingExec {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl PluginExec for CountingExec {
        async fn exec(&self, _req: PluginRequest) -> Result<PluginResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(respond::success(json!({"ok": true})))
        }
    }

    struct FailingExec;

    #[async_trait::async_trait]
    impl PluginExec for FailingExec {
        async fn exec(&self, _req: PluginRequest) -> Result<PluginResponse> {
            Err(ApiError::UpstreamError("connection refused".into()))
        }
    }

    fn exec_table(counting: Arc<CountingExec>) -> ExecTable {
        let mut table: ExecTable = HashMap::new();
        table.insert("counting".to_string(), counting);
        table.insert("failing".to_string(), Arc::new(FailingExec));
        table
    }

    fn write_manifest(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn plugin_request(endpoint: &str) -> PluginRequest {
        PluginRequest {
            endpoint: endpoint.to_string(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    const TIKTOK_MANIFEST: &str = r#"
name = "TikTok Downloader"
description = "Download videos from TikTok URLs"
method = "GET"
category = ["downloader"]
alias = ["tiktok", "tt"]
handler = "counting"
"#;

    const SEARCH_MANIFEST: &str = r#"
name = "Komiku Search"
description = "Search manga on Komiku"
method = "GET"
category = ["anime"]
alias = ["komiku-search"]
handler = "counting"
"#;

    #[tokio::test]
    async fn test_load_registers_all_valid_manifests() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "downloader/tiktok.toml", TIKTOK_MANIFEST);
        write_manifest(dir.path(), "anime/komiku_search.toml", SEARCH_MANIFEST);

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        let count = loader.load().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(loader.metadata().len(), 2);
        let snapshot = loader.snapshot();
        assert!(snapshot.route(&Method::GET, "/downloader/tiktok").is_some());
        assert!(snapshot.route(&Method::GET, "/downloader/tt").is_some());
        assert!(snapshot.route(&Method::GET, "/anime/komiku-search").is_some());
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "downloader/tiktok.toml", TIKTOK_MANIFEST);
        // Missing the mandatory handler binding
        write_manifest(
            dir.path(),
            "downloader/broken.toml",
            r#"
name = "Broken"
method = "GET"
alias = ["broken"]
"#,
        );
        // Not TOML at all
        write_manifest(dir.path(), "downloader/noise.toml", "{{{{");

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        let count = loader.load().await.unwrap();

        assert_eq!(count, 1);
        assert!(loader
            .snapshot()
            .route(&Method::GET, "/downloader/broken")
            .is_none());
    }

    #[tokio::test]
    async fn test_unbound_handler_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            "downloader/ghost.toml",
            r#"
name = "Ghost"
description = "d"
method = "GET"
category = ["downloader"]
alias = ["ghost"]
handler = "does_not_exist"
"#,
        );

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        assert_eq!(loader.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_alias_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            "downloader/empty.toml",
            r#"
name = "Empty"
description = "d"
method = "GET"
category = ["downloader"]
alias = []
handler = "counting"
"#,
        );

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        assert_eq!(loader.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_manifest() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "downloader/tiktok.toml", TIKTOK_MANIFEST);

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        loader.load().await.unwrap();
        assert_eq!(loader.handler_count(), 1);

        write_manifest(dir.path(), "anime/komiku_search.toml", SEARCH_MANIFEST);
        assert!(loader.reload().await);
        assert_eq!(loader.handler_count(), 2);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "downloader/tiktok.toml", TIKTOK_MANIFEST);

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        loader.load().await.unwrap();
        let before = loader.metadata();

        // Make the scan fail wholesale
        drop(dir);
        assert!(!loader.reload().await);

        let after = loader.metadata();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].endpoint, after[0].endpoint);
        assert!(loader
            .snapshot()
            .route(&Method::GET, "/downloader/tiktok")
            .is_some());
    }

    #[tokio::test]
    async fn test_reload_with_bad_file_keeps_scanning() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "downloader/tiktok.toml", TIKTOK_MANIFEST);

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        loader.load().await.unwrap();

        // A new malformed file does not roll back or drop valid handlers
        write_manifest(dir.path(), "downloader/broken.toml", "not toml at all [");
        assert!(loader.reload().await);
        assert_eq!(loader.handler_count(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_route_is_structured_404() {
        let dir = TempDir::new().unwrap();
        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        loader.load().await.unwrap();

        let response = loader
            .dispatch(&Method::GET, "/nope", plugin_request("/nope"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "API endpoint not found");
        assert_eq!(body["path"], "/api/nope");
    }

    #[tokio::test]
    async fn test_dispatch_disabled_never_invokes_exec() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            "downloader/terabox.toml",
            r#"
name = "Terabox Downloader"
description = "d"
method = "GET"
category = ["downloader"]
alias = ["terabox"]
disabled = true
disabledReason = "Upstream endpoint is unstable"
handler = "counting"
"#,
        );

        let counting = CountingExec::new();
        let loader = PluginLoader::new(dir.path(), exec_table(counting.clone()));
        loader.load().await.unwrap();

        for _ in 0..3 {
            let response = loader
                .dispatch(
                    &Method::GET,
                    "/downloader/terabox",
                    plugin_request("/downloader/terabox"),
                )
                .await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Plugin is disabled");
            assert_eq!(body["reason"], "Upstream endpoint is unstable");
            assert_eq!(body["plugin"], "Terabox Downloader");
        }

        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_deprecated_sets_headers_and_runs() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            "downloader/old.toml",
            r#"
name = "Old Downloader"
description = "d"
method = "GET"
category = ["downloader"]
alias = ["old"]
deprecated = true
deprecatedReason = "Use /downloader/tiktok instead"
handler = "counting"
"#,
        );

        let counting = CountingExec::new();
        let loader = PluginLoader::new(dir.path(), exec_table(counting.clone()));
        loader.load().await.unwrap();

        let response = loader
            .dispatch(
                &Method::GET,
                "/downloader/old",
                plugin_request("/downloader/old"),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("X-Plugin-Deprecated").unwrap(),
            "true"
        );
        assert_eq!(
            response.headers().get("X-Deprecation-Reason").unwrap(),
            "Use /downloader/tiktok instead"
        );
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_exec_error_becomes_structured_500() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            "downloader/flaky.toml",
            r#"
name = "Flaky"
description = "d"
method = "GET"
category = ["downloader"]
alias = ["flaky"]
handler = "failing"
"#,
        );

        let loader = PluginLoader::new(dir.path(), exec_table(CountingExec::new()));
        loader.load().await.unwrap();

        let response = loader
            .dispatch(
                &Method::GET,
                "/downloader/flaky",
                plugin_request("/downloader/flaky"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Plugin execution error");
        assert_eq!(body["plugin"], "Flaky");
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }
}
