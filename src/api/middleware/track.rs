//! Request tracking middleware
//!
//! Records every completed `/api` response into the stats tracker. The
//! discovery/meta endpoints are excluded so they cannot inflate the
//! aggregates they report.

use crate::api::middleware::extract_client_ip;
use crate::stats::StatsTracker;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Path prefixes excluded from stats tracking
const EXCLUDED_PATHS: &[&str] = &[
    "/api/plugins",
    "/api/stats",
    "/api/categories",
    "/api/health",
    "/docs",
];

/// Whether a request path is excluded from tracking
pub fn is_excluded_from_tracking(path: &str) -> bool {
    EXCLUDED_PATHS.iter().any(|prefix| path.starts_with(prefix))
}

/// Tracking middleware: runs the request, then records its outcome
pub async fn track_requests(
    State(stats): State<Arc<StatsTracker>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = extract_client_ip(&request);
    let started = Instant::now();

    let response = next.run(request).await;

    if path.starts_with("/api") {
        let status = response.status().as_u16();
        info!(
            "{} {} {} in {}ms",
            method,
            path,
            status,
            started.elapsed().as_millis()
        );

        if !is_excluded_from_tracking(&path) {
            let tracked = stats.track_request(&path, status, &client_ip).await;
            if !tracked {
                debug!(ip = %client_ip, "Failed request not tracked (limit exceeded)");
            }
        }
    }

    response
}
