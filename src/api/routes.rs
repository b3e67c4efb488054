//! API routes

use crate::api::handlers::{
    dispatch_plugin, get_stats, get_visitor_chart, health_check, list_categories, list_plugins,
    plugins_by_category, AppState,
};
use crate::api::middleware::{rate_limit_middleware, track_requests};
use axum::{
    middleware,
    routing::{any, get},
    Router,
};

/// Build the API routes
///
/// Fixed meta routes win over the plugin wildcard; every route sits behind
/// the rate limiter (outermost) and the stats tracker, so the per-request
/// order is rate-limit check, dispatch, handler, tracking.
pub fn build_api_routes(state: AppState) -> Router {
    let limiter = state.limiter.clone();
    let stats = state.stats.clone();

    Router::new()
        // Discovery endpoints
        .route("/api/plugins", get(list_plugins))
        .route("/api/plugins/category/:category", get(plugins_by_category))
        .route("/api/categories", get(list_categories))
        // Statistics endpoints
        .route("/api/stats", get(get_stats))
        .route("/api/stats/visitors", get(get_visitor_chart))
        // Health check
        .route("/api/health", get(health_check))
        // Every plugin-declared route
        .route("/api/*path", any(dispatch_plugin))
        .with_state(state)
        .layer(middleware::from_fn_with_state(stats, track_requests))
        .layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
}
