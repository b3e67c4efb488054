//! DitzzyAPI Backend Library
//!
//! This library provides the core functionality for the DitzzyAPI backend:
//! a plugin-routed REST API hub with request accounting, rate limiting, and
//! hot-reloadable endpoint discovery.

pub mod api;
pub mod core;
pub mod plugin;
pub mod stats;

// Re-export commonly used types
pub use api::{ApiServer, AppState, RateLimiter};
pub use crate::core::{ApiError, Config, Logger, Result};
pub use plugin::{PluginLoader, PluginWatcher};
pub use stats::{StatsStore, StatsTracker};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
