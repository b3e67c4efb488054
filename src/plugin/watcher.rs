//! Hot-reload file watcher
//!
//! Watches the plugin manifest directory and triggers a full loader reload
//! after filesystem activity settles. Events are debounced: the reload fires
//! once the directory has been quiet for the configured interval, so partial
//! writes and editor save storms collapse into a single reload.

use crate::core::error::{ApiError, Result};
use crate::plugin::loader::PluginLoader;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Running watcher over a plugin manifest directory
pub struct PluginWatcher {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl PluginWatcher {
    /// Start watching `plugins_dir` recursively, reloading `loader` after
    /// events have been quiet for `debounce`.
    pub fn start(
        loader: Arc<PluginLoader>,
        plugins_dir: &Path,
        debounce: Duration,
    ) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_relevant(&event) => {
                    let _ = tx.send(event);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Plugin watcher error"),
            }
        })
        .map_err(|e| ApiError::InitializationError(format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(plugins_dir, RecursiveMode::Recursive)
            .map_err(|e| {
                ApiError::InitializationError(format!(
                    "failed to watch {}: {}",
                    plugins_dir.display(),
                    e
                ))
            })?;

        info!(dir = %plugins_dir.display(), "Hot reload enabled for plugins");

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(kind = ?event.kind, paths = ?event.paths, "Plugin change detected");

                // Absorb further events until the directory settles
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(_)) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                loader.reload().await;
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Stop watching. The last scheduled reload may be dropped.
    pub fn stop(self) {
        self.task.abort();
        info!("Hot reload stopped");
    }
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::respond;
    use crate::plugin::types::{ExecTable, PluginExec, PluginRequest, PluginResponse};
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct NoopExec;

    #[async_trait::async_trait]
    impl PluginExec for NoopExec {
        async fn exec(&self, _req: PluginRequest) -> Result<PluginResponse> {
            Ok(respond::success(serde_json::json!(null)))
        }
    }

    fn exec_table() -> ExecTable {
        let mut table: ExecTable = HashMap::new();
        table.insert("noop".to_string(), Arc::new(NoopExec) as Arc<dyn PluginExec>);
        table
    }

    #[tokio::test]
    async fn test_watcher_reloads_on_new_manifest() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(PluginLoader::new(dir.path(), exec_table()));
        loader.load().await.unwrap();
        assert_eq!(loader.handler_count(), 0);

        let watcher = PluginWatcher::start(
            loader.clone(),
            dir.path(),
            Duration::from_millis(50),
        )
        .unwrap();

        std::fs::write(
            dir.path().join("greet.toml"),
            r#"
name = "Greet user"
description = "Greet the user"
method = "GET"
category = ["misc"]
alias = ["data"]
handler = "noop"
"#,
        )
        .unwrap();

        // Wait for the debounced reload to land
        let mut reloaded = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if loader.handler_count() == 1 {
                reloaded = true;
                break;
            }
        }
        assert!(reloaded, "watcher never picked up the new manifest");

        watcher.stop();
    }
}
