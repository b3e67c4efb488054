//! Request statistics subsystem
//!
//! This module provides request accounting and persistence:
//! - Global and per-endpoint counters with success/failure classification
//! - Unique visitor tracking and daily visitor buckets
//! - Per-IP failure penalties against stats-skewing clients
//! - Debounced JSON-file persistence with a versioned schema

pub mod persistence;
pub mod tracker;

pub use persistence::{StatsSnapshot, StatsStore, SCHEMA_VERSION};
pub use tracker::{
    EndpointStats, GlobalStats, StatsTracker, TopEndpoint, TrackerConfig, UptimeInfo, VisitorData,
};
