use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::engagement::models::{
    StoryBookmark, StoryRating, StoryRead, StoryReward,
};

// ==================== Requests ====================

/// Body of bookmark create/remove requests
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StoryRefDto {
    pub story: i64,
}

/// Numeric fields are read wide so that any out-of-range value reaches
/// validation and comes back as a field error
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RateStoryDto {
    pub story: i64,
    #[validate(range(min = 1, max = 5, message = "Score must be between 1 and 5"))]
    pub score: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RewardStoryDto {
    pub story: i64,
    /// Defaults to the story's configured reward points
    #[validate(range(min = 0, max = 100, message = "Points must be between 0 and 100"))]
    pub points: Option<i64>,
}

/// Narrow a validated value to its smallint column
pub fn to_smallint(field: &str, value: i64) -> Result<i16> {
    i16::try_from(value).map_err(|_| AppError::InvalidFields(vec![format!("{}: out of range", field)]))
}

/// Optional `?story=` filter for list endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StoryFilterQuery {
    pub story: Option<i64>,
}

// ==================== Responses ====================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookmarkResponseDto {
    pub id: i64,
    pub story: i64,
    pub user: i64,
    pub created_at: DateTime<Utc>,
}

impl From<StoryBookmark> for BookmarkResponseDto {
    fn from(b: StoryBookmark) -> Self {
        Self {
            id: b.id,
            story: b.story_id,
            user: b.user_id,
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingResponseDto {
    pub id: i64,
    pub story: i64,
    pub user: i64,
    pub score: i16,
    pub created_at: DateTime<Utc>,
}

impl From<StoryRating> for RatingResponseDto {
    fn from(r: StoryRating) -> Self {
        Self {
            id: r.id,
            story: r.story_id,
            user: r.user_id,
            score: r.detail.score,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadResponseDto {
    pub id: i64,
    pub story: i64,
    pub user: i64,
    /// First time the story was read
    pub created_at: DateTime<Utc>,
}

impl From<StoryRead> for ReadResponseDto {
    fn from(r: StoryRead) -> Self {
        Self {
            id: r.id,
            story: r.story_id,
            user: r.user_id,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardResponseDto {
    pub id: i64,
    pub story: i64,
    pub user: i64,
    pub points: i16,
    pub created_at: DateTime<Utc>,
}

impl From<StoryReward> for RewardResponseDto {
    fn from(r: StoryReward) -> Self {
        Self {
            id: r.id,
            story: r.story_id,
            user: r.user_id,
            points: r.detail.points,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedCountDto {
    pub count: u64,
}
