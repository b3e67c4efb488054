//! DitzzyAPI Backend - Rust Implementation
//!
//! A plugin-routed REST API hub with request accounting and rate limiting.

use ditzzy_api::{api, core, plugin, stats};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting DitzzyAPI Backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        plugin_dir = ?config.plugins.plugin_dir,
        enable_hot_reload = config.plugins.enable_hot_reload,
        "Plugin configuration"
    );

    // Initialize the stats tracker, restoring persisted counters when enabled
    let tracker_config = stats::TrackerConfig {
        max_fails_per_ip: config.stats.max_fails_per_ip,
        fail_window: Duration::from_secs(config.stats.fail_window_hours * 60 * 60),
        visitor_retention_days: config.stats.visitor_retention_days,
        save_debounce: Duration::from_secs(config.stats.save_debounce_seconds),
    };
    let tracker = if config.stats.persistence_enabled {
        let store = stats::StatsStore::new(config.stats.persist_path.clone());
        let tracker = stats::StatsTracker::with_persistence(tracker_config, store).await;
        info!("Stats tracker initialized with persistence");
        tracker
    } else {
        info!("Stats persistence disabled - stats will be in-memory only");
        stats::StatsTracker::new(tracker_config)
    };
    tracker.spawn_failure_sweeper(Duration::from_secs(
        config.stats.fail_sweep_interval_seconds,
    ));

    // Shared HTTP client for outbound plugin calls
    let client = Arc::new(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_seconds))
            .build()?,
    );

    // Initialize the plugin system
    let exec_table = plugin::builtin::exec_table(client, &config.http);
    let loader = Arc::new(plugin::PluginLoader::new(
        config.plugins.plugin_dir.clone(),
        exec_table,
    ));
    loader.load().await?;

    let _watcher = if config.plugins.enable_hot_reload {
        Some(plugin::PluginWatcher::start(
            loader.clone(),
            &config.plugins.plugin_dir,
            Duration::from_millis(config.plugins.reload_debounce_ms),
        )?)
    } else {
        None
    };

    // Rate limiter for everything under /api
    let limiter = Arc::new(api::RateLimiter::from_config(&config.rate_limit));
    limiter.spawn_sweeper();

    // Compose and start the HTTP server
    let state = api::AppState {
        loader,
        stats: tracker,
        limiter,
        config: Arc::new(config),
    };
    let server = api::ApiServer::new(state);

    info!("DitzzyAPI Backend initialized successfully");
    server.serve().await?;

    Ok(())
}
