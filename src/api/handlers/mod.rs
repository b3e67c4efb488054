//! API request handlers

pub mod dispatch;
pub mod plugins;
pub mod stats;

pub use dispatch::*;
pub use plugins::*;
pub use stats::*;

use crate::api::middleware::RateLimiter;
use crate::core::config::Config;
use crate::plugin::PluginLoader;
use crate::stats::StatsTracker;
use std::sync::Arc;

/// Shared application state for handlers
///
/// Constructed once by the composition root; every subsystem is an explicit
/// member rather than a global.
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<PluginLoader>,
    pub stats: Arc<StatsTracker>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}
