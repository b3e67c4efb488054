//! Plugin discovery response models

use crate::plugin::types::PluginMetadata;
use serde::{Deserialize, Serialize};

/// Response body for GET /api/plugins
#[derive(Debug, Serialize, Deserialize)]
pub struct PluginListResponse {
    pub success: bool,
    pub count: usize,
    pub plugins: Vec<PluginMetadata>,
}

/// Response body for GET /api/plugins/category/{category}
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryPluginsResponse {
    pub success: bool,
    pub category: String,
    pub count: usize,
    pub plugins: Vec<PluginMetadata>,
}

/// One category with its handler count
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Response body for GET /api/categories
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<CategoryCount>,
}
