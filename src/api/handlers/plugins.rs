//! Plugin discovery handlers

use crate::api::models::{
    CategoriesResponse, CategoryCount, CategoryPluginsResponse, PluginListResponse,
};
use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::BTreeMap;

use super::AppState;

/// Handler for GET /api/plugins - list all documented plugins
pub async fn list_plugins(State(state): State<AppState>) -> Json<PluginListResponse> {
    let plugins = state.loader.metadata();
    Json(PluginListResponse {
        success: true,
        count: plugins.len(),
        plugins,
    })
}

/// Handler for GET /api/plugins/category/{category} - plugins in one category
pub async fn plugins_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<CategoryPluginsResponse> {
    let plugins: Vec<_> = state
        .loader
        .metadata()
        .into_iter()
        .filter(|plugin| plugin.category.iter().any(|c| c == &category))
        .collect();

    Json(CategoryPluginsResponse {
        success: true,
        category,
        count: plugins.len(),
        plugins,
    })
}

/// Handler for GET /api/categories - categories with handler counts
pub async fn list_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for plugin in state.loader.metadata() {
        for category in &plugin.category {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
    }

    Json(CategoriesResponse {
        success: true,
        categories: counts
            .into_iter()
            .map(|(name, count)| CategoryCount { name, count })
            .collect(),
    })
}
