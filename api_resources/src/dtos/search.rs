use db::models::listing::ResourceListing;
use serde::{Deserialize, Serialize};

/// Raw query string of the directory search. Numbers and flags stay strings
/// here so malformed values fall back to defaults instead of failing the
/// query extractor.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub category: Option<String>,
    pub state: Option<String>,
    pub is_remote: Option<String>,
    /// Comma separated.
    pub cause_areas: Option<String>,
    pub subcategory: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub listings: Vec<ResourceListing>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}
