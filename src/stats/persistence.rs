//! Stats persistence
//!
//! Serializes the tracker state to a JSON file. The on-disk document carries
//! an explicit schema version; snapshots with an unknown version are ignored
//! on load so a format change can never corrupt the tracker, only reset it.
//! Every persistence failure is logged and swallowed; tracking continues
//! in-memory regardless.

use crate::core::error::{ApiError, Result};
use crate::stats::tracker::EndpointStats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized form of the tracker state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub version: u32,
    pub total_requests: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub unique_visitors: Vec<String>,
    pub start_time: i64,
    pub endpoints: HashMap<String, EndpointStats>,
    pub visitors_by_day: HashMap<String, Vec<String>>,
}

/// JSON-file backed snapshot store
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted snapshot, if a usable one exists.
    ///
    /// Missing files, parse failures, and unknown schema versions all yield
    /// `None`: absence of prior state is not an error, the tracker starts
    /// fresh.
    pub async fn load(&self) -> Option<StatsSnapshot> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No existing stats found, starting fresh");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Error reading stats file, starting fresh");
                return None;
            }
        };

        let snapshot: StatsSnapshot = match serde_json::from_slice(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Error parsing stats file, starting fresh");
                return None;
            }
        };

        if snapshot.version != SCHEMA_VERSION {
            warn!(
                found = snapshot.version,
                expected = SCHEMA_VERSION,
                "Unknown stats schema version, starting fresh"
            );
            return None;
        }

        info!(
            total_requests = snapshot.total_requests,
            "Stats loaded from {}",
            self.path.display()
        );
        Some(snapshot)
    }

    /// Write the snapshot atomically (temp file + rename)
    pub async fn save(&self, snapshot: &StatsSnapshot) -> Result<()> {
        let serialized = serde_json::to_vec(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &serialized).await?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| {
                ApiError::PersistenceError(format!(
                    "failed to move snapshot into place: {}",
                    e
                ))
            })?;

        Ok(())
    }
}
