use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListing {
    pub id: Uuid,
    pub name: String,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub category: String,
    pub subcategories: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_remote: bool,
    pub is_nationwide: bool,
    pub cause_areas: Vec<String>,
    pub website: Option<String>,
    pub is_featured: bool,
}
