//! Statistics handlers

use crate::api::models::{
    HealthResponse, StatsPayload, StatsResponse, VisitorsQuery, VisitorsResponse,
};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;

use super::AppState;

/// How many endpoints the stats overview reports
const TOP_ENDPOINT_COUNT: usize = 5;

/// Default and maximum span of the visitor chart, in days
const DEFAULT_CHART_DAYS: u32 = 30;
const MAX_CHART_DAYS: u32 = 365;

/// Handler for GET /api/stats - global stats and busiest endpoints
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let global = state.stats.global_stats().await;
    let top_endpoints = state.stats.top_endpoints(TOP_ENDPOINT_COUNT).await;

    Json(StatsResponse {
        success: true,
        stats: StatsPayload {
            global,
            top_endpoints,
        },
    })
}

/// Handler for GET /api/stats/visitors?days=N - daily visitor chart
pub async fn get_visitor_chart(
    State(state): State<AppState>,
    Query(query): Query<VisitorsQuery>,
) -> Json<VisitorsResponse> {
    let days = query
        .days
        .unwrap_or(DEFAULT_CHART_DAYS)
        .clamp(1, MAX_CHART_DAYS);

    Json(VisitorsResponse {
        success: true,
        data: state.stats.visitor_chart_data(days).await,
    })
}

/// Handler for GET /api/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().timestamp(),
    })
}
