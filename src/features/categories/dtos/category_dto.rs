use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::categories::models::Category;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub is_active: bool,
    /// True when the name contains the subcategory separator
    pub is_subcategory: bool,
    pub created_at: DateTime<Utc>,
}

impl CategoryResponseDto {
    pub fn from_category(c: Category, separator: &str) -> Self {
        Self {
            is_subcategory: c.is_subcategory(separator),
            id: c.id,
            org_id: c.org_id,
            name: c.name,
            is_active: c.is_active,
            created_at: c.created_at,
        }
    }
}

/// Category with its resolved place in the hierarchy
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDetailDto {
    #[serde(flatten)]
    pub category: CategoryResponseDto,
    pub parent: Option<CategoryResponseDto>,
    pub subcategory_ids: Vec<i64>,
}
