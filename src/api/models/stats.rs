//! Statistics response models

use crate::stats::{GlobalStats, TopEndpoint, VisitorData};
use serde::{Deserialize, Serialize};

/// Response body for GET /api/stats
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsPayload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPayload {
    pub global: GlobalStats,
    pub top_endpoints: Vec<TopEndpoint>,
}

/// Query parameters for GET /api/stats/visitors
#[derive(Debug, Deserialize)]
pub struct VisitorsQuery {
    pub days: Option<u32>,
}

/// Response body for GET /api/stats/visitors
#[derive(Debug, Serialize, Deserialize)]
pub struct VisitorsResponse {
    pub success: bool,
    pub data: Vec<VisitorData>,
}

/// Response body for GET /api/health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
}
