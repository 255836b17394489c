use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::badges::models::{AwardedBadge, BadgeType};
use crate::features::badges::repository::ResetCounts;
use crate::shared::constants::MAX_BADGE_THRESHOLD;

// ==================== Queries ====================

/// Optional `?org=` filter
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrgFilterQuery {
    pub org: Option<i64>,
}

// ==================== User-facing responses ====================

/// Badge type as shown to users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BadgeTypeDto {
    pub id: i64,
    pub org_id: i64,
    pub title: String,
    pub image: Option<String>,
    pub validation_category_id: Option<i64>,
    pub validation_threshold: i32,
}

impl From<&BadgeType> for BadgeTypeDto {
    fn from(bt: &BadgeType) -> Self {
        Self {
            id: bt.id,
            org_id: bt.org_id,
            title: bt.title.clone(),
            image: bt.image.clone(),
            validation_category_id: bt.validation_category_id,
            validation_threshold: bt.validation_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserBadgeResponseDto {
    pub id: i64,
    pub badge_type: BadgeTypeDto,
    /// Finished description of the badge type
    pub description: String,
    pub user: i64,
    pub offered_at: DateTime<Utc>,
}

impl From<AwardedBadge> for UserBadgeResponseDto {
    fn from(awarded: AwardedBadge) -> Self {
        Self {
            id: awarded.badge.id,
            badge_type: BadgeTypeDto::from(&awarded.badge_type),
            description: awarded.badge_type.finished_description,
            user: awarded.badge.user_id,
            offered_at: awarded.badge.offered_at,
        }
    }
}

/// One catalog entry with the user's live progress
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BadgeProgressDto {
    pub badge: BadgeTypeDto,
    pub owned: bool,
    pub read_count: i64,
    pub description: String,
}

/// Rows removed by an engagement reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResetCountsDto {
    pub read_count: u64,
    pub reward_count: u64,
    pub badge_count: u64,
}

impl From<ResetCounts> for ResetCountsDto {
    fn from(counts: ResetCounts) -> Self {
        Self {
            read_count: counts.reads,
            reward_count: counts.rewards,
            badge_count: counts.badges,
        }
    }
}

// ==================== Administration ====================

/// Full badge type, for staff
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BadgeTypeAdminDto {
    pub id: i64,
    pub org_id: i64,
    pub title: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub validation_category_id: Option<i64>,
    pub validation_threshold: i32,
    pub unfinished_template: String,
    pub finished_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BadgeType> for BadgeTypeAdminDto {
    fn from(bt: BadgeType) -> Self {
        Self {
            id: bt.id,
            org_id: bt.org_id,
            title: bt.title,
            image: bt.image,
            is_active: bt.is_active,
            validation_category_id: bt.validation_category_id,
            validation_threshold: bt.validation_threshold,
            unfinished_template: bt.unfinished_template,
            finished_description: bt.finished_description,
            created_at: bt.created_at,
            updated_at: bt.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBadgeTypeDto {
    pub org_id: i64,
    #[validate(length(min = 1, max = 50, message = "Title must be between 1 and 50 characters"))]
    pub title: String,
    pub image: Option<String>,
    /// Defaults to false
    pub is_active: Option<bool>,
    pub validation_category_id: Option<i64>,
    /// Defaults to 10000
    #[validate(range(min = 1, max = MAX_BADGE_THRESHOLD, message = "Threshold must be between 1 and 10000"))]
    pub validation_threshold: Option<i32>,
    pub unfinished_template: Option<String>,
    pub finished_description: Option<String>,
}

/// Partial update; `null` clears the image or the validation category
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBadgeTypeDto {
    #[validate(length(min = 1, max = 50, message = "Title must be between 1 and 50 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub validation_category_id: Option<Option<i64>>,
    #[validate(range(min = 1, max = MAX_BADGE_THRESHOLD, message = "Threshold must be between 1 and 10000"))]
    pub validation_threshold: Option<i32>,
    pub unfinished_template: Option<String>,
    pub finished_description: Option<String>,
}

/// Tell a missing field (`None`) apart from an explicit `null` (`Some(None)`)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
