use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Published story; engagement facts always point at one
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Story {
    pub id: i64,
    pub org_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-story settings, created lazily on first access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct StorySettings {
    pub id: i64,
    #[serde(rename = "story")]
    pub story_id: i64,
    /// Points granted by a reward without an explicit amount
    pub reward_points: i16,
    pub display_rating: bool,
    /// Cached rounded average of all ratings, e.g. "4.00"
    #[schema(value_type = String, example = "4.00")]
    pub rating: Decimal,
}
