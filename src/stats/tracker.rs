//! Request statistics tracker
//!
//! Process-wide request accounting: global and per-endpoint counters, unique
//! visitor sets, daily visitor buckets for the activity chart, and a per-IP
//! failure penalty that stops a single broken client from skewing the
//! aggregates.
//!
//! Classification contract: a response is a success when its status is in
//! [200, 400) and a failure when it is >= 500; 4xx responses count toward
//! `total_requests` only.

use crate::stats::persistence::{StatsSnapshot, StatsStore, SCHEMA_VERSION};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

/// Per-endpoint counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    /// Milliseconds since the epoch
    pub last_accessed: i64,
}

/// One point of the visitor activity chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitorData {
    /// Milliseconds since the epoch, start of day UTC
    pub timestamp: i64,
    pub count: usize,
}

/// Global statistics as reported by `/api/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_requests: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub unique_visitors: usize,
    /// Percentage with two decimal places, "0.00" when no requests were seen
    pub success_rate: String,
    pub uptime: UptimeInfo,
    pub persistence_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeInfo {
    pub ms: i64,
    pub hours: i64,
    pub days: i64,
    pub formatted: String,
}

/// Per-endpoint counters plus the endpoint path, for top-endpoint listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEndpoint {
    pub endpoint: String,
    #[serde(flatten)]
    pub stats: EndpointStats,
}

/// Tracker tuning knobs, derived from [`crate::core::config::StatsConfig`]
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub max_fails_per_ip: u32,
    pub fail_window: Duration,
    pub visitor_retention_days: u32,
    pub save_debounce: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_fails_per_ip: 1,
            fail_window: Duration::from_secs(12 * 60 * 60),
            visitor_retention_days: 90,
            save_debounce: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
struct IpFailure {
    count: u32,
    /// Milliseconds since the epoch
    reset_time: i64,
}

#[derive(Default)]
struct TrackerState {
    total_requests: u64,
    total_success: u64,
    total_failed: u64,
    unique_visitors: HashSet<String>,
    endpoints: HashMap<String, EndpointStats>,
    visitors_by_day: HashMap<String, HashSet<String>>,
    start_time: i64,
    ip_failures: HashMap<String, IpFailure>,
}

impl TrackerState {
    fn fresh() -> Self {
        Self {
            start_time: Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    fn from_snapshot(snapshot: StatsSnapshot) -> Self {
        Self {
            total_requests: snapshot.total_requests,
            total_success: snapshot.total_success,
            total_failed: snapshot.total_failed,
            unique_visitors: snapshot.unique_visitors.into_iter().collect(),
            endpoints: snapshot.endpoints,
            visitors_by_day: snapshot
                .visitors_by_day
                .into_iter()
                .map(|(day, ips)| (day, ips.into_iter().collect()))
                .collect(),
            start_time: snapshot.start_time,
            ip_failures: HashMap::new(),
        }
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            version: SCHEMA_VERSION,
            total_requests: self.total_requests,
            total_success: self.total_success,
            total_failed: self.total_failed,
            unique_visitors: self.unique_visitors.iter().cloned().collect(),
            start_time: self.start_time,
            endpoints: self.endpoints.clone(),
            visitors_by_day: self
                .visitors_by_day
                .iter()
                .map(|(day, ips)| (day.clone(), ips.iter().cloned().collect()))
                .collect(),
        }
    }
}

/// Request statistics tracker
pub struct StatsTracker {
    state: RwLock<TrackerState>,
    config: TrackerConfig,
    store: Option<Arc<StatsStore>>,
    dirty_tx: Option<mpsc::Sender<()>>,
}

impl StatsTracker {
    /// Construct an in-memory tracker
    pub fn new(config: TrackerConfig) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(TrackerState::fresh()),
            config,
            store: None,
            dirty_tx: None,
        })
    }

    /// Construct a tracker backed by the given store, loading any persisted
    /// snapshot and spawning the debounced persister task.
    pub async fn with_persistence(config: TrackerConfig, store: StatsStore) -> Arc<Self> {
        let state = match store.load().await {
            Some(snapshot) => TrackerState::from_snapshot(snapshot),
            None => TrackerState::fresh(),
        };

        let (tx, rx) = mpsc::channel(1);
        let tracker = Arc::new(Self {
            state: RwLock::new(state),
            config,
            store: Some(Arc::new(store)),
            dirty_tx: Some(tx),
        });

        tracker.clone().spawn_persister(rx);
        tracker
    }

    fn spawn_persister(self: Arc<Self>, mut rx: mpsc::Receiver<()>) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let debounce = self.config.save_debounce;

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(debounce).await;
                // Coalesce every mark that arrived during the debounce window
                while rx.try_recv().is_ok() {}

                let snapshot = self.state.read().await.snapshot();
                if let Err(e) = store.save(&snapshot).await {
                    error!(error = %e, "Error saving stats");
                }
            }
        });
    }

    /// Spawn the periodic sweep of expired IP failure records
    pub fn spawn_failure_sweeper(self: &Arc<Self>, interval: Duration) {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracker.sweep_failures().await;
            }
        });
    }

    /// Drop expired IP failure records
    pub async fn sweep_failures(&self) {
        let now = Utc::now().timestamp_millis();
        let mut state = self.state.write().await;
        state.ip_failures.retain(|_, tracking| now <= tracking.reset_time);
    }

    /// Record one completed request.
    ///
    /// Returns `false` when the request was swallowed by the per-IP failure
    /// penalty, in which case no counter was touched.
    pub async fn track_request(&self, endpoint: &str, status_code: u16, client_ip: &str) -> bool {
        let now = Utc::now().timestamp_millis();
        let is_failed = status_code >= 500;

        let mut state = self.state.write().await;

        if is_failed {
            let window_ms = self.config.fail_window.as_millis() as i64;
            match state.ip_failures.entry(client_ip.to_string()) {
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(IpFailure {
                        count: 1,
                        reset_time: now + window_ms,
                    });
                }
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let tracking = entry.get_mut();
                    if now > tracking.reset_time {
                        tracking.count = 1;
                        tracking.reset_time = now + window_ms;
                    } else if tracking.count >= self.config.max_fails_per_ip {
                        return false;
                    } else {
                        tracking.count += 1;
                    }
                }
            }
        } else if let Some(tracking) = state.ip_failures.get_mut(client_ip) {
            if tracking.count > 0 {
                tracking.count -= 1;
            }
        }

        state.total_requests += 1;
        state.unique_visitors.insert(client_ip.to_string());

        let today = Utc::now().date_naive();
        let date_key = today.format("%Y-%m-%d").to_string();
        state
            .visitors_by_day
            .entry(date_key)
            .or_default()
            .insert(client_ip.to_string());
        self.prune_visitor_buckets(&mut state, today);

        let is_success = (200..400).contains(&status_code);
        if is_success {
            state.total_success += 1;
        } else if is_failed {
            state.total_failed += 1;
        }

        let endpoint_stats = state.endpoints.entry(endpoint.to_string()).or_default();
        endpoint_stats.total_requests += 1;
        endpoint_stats.last_accessed = now;
        if is_success {
            endpoint_stats.success_requests += 1;
        } else if is_failed {
            endpoint_stats.failed_requests += 1;
        }

        drop(state);
        self.mark_dirty();
        true
    }

    fn prune_visitor_buckets(&self, state: &mut TrackerState, today: NaiveDate) {
        let horizon = today - ChronoDuration::days(i64::from(self.config.visitor_retention_days));
        state.visitors_by_day.retain(|day, _| {
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(|date| date >= horizon)
                .unwrap_or(false)
        });
    }

    fn mark_dirty(&self) {
        if let Some(tx) = &self.dirty_tx {
            // A full channel means a save is already pending
            let _ = tx.try_send(());
        }
    }

    /// Global totals and uptime
    pub async fn global_stats(&self) -> GlobalStats {
        let state = self.state.read().await;
        let uptime_ms = Utc::now().timestamp_millis() - state.start_time;
        let uptime_hours = uptime_ms / (1000 * 60 * 60);
        let uptime_days = uptime_hours / 24;

        let success_rate = if state.total_requests > 0 {
            format!(
                "{:.2}",
                state.total_success as f64 / state.total_requests as f64 * 100.0
            )
        } else {
            "0.00".to_string()
        };

        let formatted = if uptime_days > 0 {
            format!("{}d {}h", uptime_days, uptime_hours % 24)
        } else {
            format!("{}h", uptime_hours)
        };

        GlobalStats {
            total_requests: state.total_requests,
            total_success: state.total_success,
            total_failed: state.total_failed,
            unique_visitors: state.unique_visitors.len(),
            success_rate,
            uptime: UptimeInfo {
                ms: uptime_ms,
                hours: uptime_hours,
                days: uptime_days,
                formatted,
            },
            persistence_enabled: self.store.is_some(),
        }
    }

    /// Endpoints by request volume, descending, truncated to `limit`
    pub async fn top_endpoints(&self, limit: usize) -> Vec<TopEndpoint> {
        let state = self.state.read().await;
        let mut endpoints: Vec<TopEndpoint> = state
            .endpoints
            .iter()
            .map(|(endpoint, stats)| TopEndpoint {
                endpoint: endpoint.clone(),
                stats: stats.clone(),
            })
            .collect();
        endpoints.sort_by(|a, b| b.stats.total_requests.cmp(&a.stats.total_requests));
        endpoints.truncate(limit);
        endpoints
    }

    /// Counters for one endpoint, if it was ever tracked
    pub async fn endpoint_stats(&self, endpoint: &str) -> Option<EndpointStats> {
        self.state.read().await.endpoints.get(endpoint).cloned()
    }

    /// Daily visitor counts for the last `days` days, oldest first and
    /// zero-filled; always exactly `days` entries.
    pub async fn visitor_chart_data(&self, days: u32) -> Vec<VisitorData> {
        let state = self.state.read().await;
        let today = Utc::now().date_naive();

        (0..i64::from(days))
            .rev()
            .map(|offset| {
                let date = today - ChronoDuration::days(offset);
                let key = date.format("%Y-%m-%d").to_string();
                let count = state
                    .visitors_by_day
                    .get(&key)
                    .map(HashSet::len)
                    .unwrap_or(0);
                VisitorData {
                    timestamp: date
                        .and_hms_opt(0, 0, 0)
                        .expect("midnight is valid")
                        .and_utc()
                        .timestamp_millis(),
                    count,
                }
            })
            .collect()
    }

    /// Write the current state to the store immediately, bypassing the
    /// debounce. Persistence errors are logged and swallowed.
    pub async fn flush(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let snapshot = self.state.read().await.snapshot();
        match store.save(&snapshot).await {
            Ok(()) => debug!("Stats saved"),
            Err(e) => error!(error = %e, "Error saving stats"),
        }
    }

    /// Reset all counters and persist the empty state
    pub async fn reset(&self) {
        {
            let mut state = self.state.write().await;
            *state = TrackerState::fresh();
        }
        info!("Stats reset");
        self.flush().await;
    }

    /// Flush on shutdown
    pub async fn shutdown(&self) {
        self.flush().await;
        if self.store.is_some() {
            info!("Stats saved on shutdown");
        }
    }
}
