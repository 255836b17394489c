use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::core::database::{is_foreign_key_violation, is_unique_violation};
use crate::core::error::{AppError, Result};
use crate::features::badges::models::{AwardedBadge, BadgeScope, BadgeType, UserBadge};

/// Which badge types a listing returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeTypeFilter {
    pub org_id: Option<i64>,
    pub active_only: bool,
}

/// Active badge types of one scope reachable with `read_count` reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityQuery {
    pub org_id: i64,
    pub scope: BadgeScope,
    pub read_count: i64,
    pub excluded_ids: Vec<i64>,
}

/// Fields of a badge type about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBadgeType {
    pub org_id: i64,
    pub title: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub validation_category_id: Option<i64>,
    pub validation_threshold: i32,
    pub unfinished_template: String,
    pub finished_description: String,
}

/// Rows removed by a user reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetCounts {
    pub reads: u64,
    pub rewards: u64,
    pub badges: u64,
}

/// Storage for badge types and user badges.
///
/// Every listing of badge types is ordered by `validation_threshold`, then id.
#[async_trait]
pub trait BadgeRepository: Send + Sync {
    async fn find_badge_type(&self, id: i64) -> Result<Option<BadgeType>>;

    async fn list_badge_types(&self, filter: BadgeTypeFilter) -> Result<Vec<BadgeType>>;

    async fn find_eligible(&self, query: &EligibilityQuery) -> Result<Vec<BadgeType>>;

    /// Fails with `Conflict` when the organization already has the title
    async fn create_badge_type(&self, new: NewBadgeType) -> Result<BadgeType>;

    /// Persist every editable field; fails with `Conflict` on a duplicate title
    async fn save_badge_type(&self, badge_type: &BadgeType) -> Result<BadgeType>;

    async fn owned_badge_type_ids(&self, user_id: i64) -> Result<Vec<i64>>;

    /// Grant the badge types to the user. Types the user already owns are
    /// skipped silently; the result holds only new grants, in input order.
    async fn insert_user_badges(
        &self,
        user_id: i64,
        badge_type_ids: &[i64],
        offered_at: DateTime<Utc>,
    ) -> Result<Vec<UserBadge>>;

    /// Badges of active types, newest first
    async fn list_user_badges(&self, user_id: i64, org_id: Option<i64>)
        -> Result<Vec<AwardedBadge>>;

    /// Delete the user's reads, rewards and badges, all or nothing
    async fn reset_user_engagement(&self, user_id: i64) -> Result<ResetCounts>;
}

/// Map write failures to user-facing errors
fn handle_db_error(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        return AppError::Conflict(
            "A badge type with this title already exists in the organization".to_string(),
        );
    }
    if is_foreign_key_violation(&e) {
        return AppError::BadRequest("Referenced organization or category does not exist".to_string());
    }

    tracing::error!("Badge write failed: {:?}", e);
    AppError::Database(e)
}

async fn delete_for_user(
    conn: &mut PgConnection,
    table: &'static str,
    user_id: i64,
) -> std::result::Result<u64, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE user_id = $1", table);
    let result = sqlx::query(&sql).bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub struct PgBadgeRepository {
    pool: PgPool,
}

impl PgBadgeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn badge_types_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, BadgeType>> {
        let badge_types = sqlx::query_as::<_, BadgeType>(
            r#"
            SELECT id, org_id, title, image, is_active, validation_category_id,
                   validation_threshold, unfinished_template, finished_description,
                   created_at, updated_at
            FROM badge_types
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load badge types: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(badge_types.into_iter().map(|bt| (bt.id, bt)).collect())
    }
}

#[async_trait]
impl BadgeRepository for PgBadgeRepository {
    async fn find_badge_type(&self, id: i64) -> Result<Option<BadgeType>> {
        sqlx::query_as::<_, BadgeType>(
            r#"
            SELECT id, org_id, title, image, is_active, validation_category_id,
                   validation_threshold, unfinished_template, finished_description,
                   created_at, updated_at
            FROM badge_types
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get badge type {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn list_badge_types(&self, filter: BadgeTypeFilter) -> Result<Vec<BadgeType>> {
        sqlx::query_as::<_, BadgeType>(
            r#"
            SELECT id, org_id, title, image, is_active, validation_category_id,
                   validation_threshold, unfinished_template, finished_description,
                   created_at, updated_at
            FROM badge_types
            WHERE ($1::BIGINT IS NULL OR org_id = $1)
              AND (NOT $2 OR is_active = TRUE)
            ORDER BY validation_threshold, id
            "#,
        )
        .bind(filter.org_id)
        .bind(filter.active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list badge types: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find_eligible(&self, query: &EligibilityQuery) -> Result<Vec<BadgeType>> {
        let category_id = match query.scope {
            BadgeScope::OrganizationWide => None,
            BadgeScope::Category(id) => Some(id),
        };

        // IS NOT DISTINCT FROM matches NULL to NULL for organization-wide types
        sqlx::query_as::<_, BadgeType>(
            r#"
            SELECT id, org_id, title, image, is_active, validation_category_id,
                   validation_threshold, unfinished_template, finished_description,
                   created_at, updated_at
            FROM badge_types
            WHERE is_active = TRUE
              AND org_id = $1
              AND validation_category_id IS NOT DISTINCT FROM $2
              AND validation_threshold <= $3
              AND NOT (id = ANY($4))
            ORDER BY validation_threshold, id
            "#,
        )
        .bind(query.org_id)
        .bind(category_id)
        .bind(query.read_count)
        .bind(query.excluded_ids.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to find eligible badge types: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn create_badge_type(&self, new: NewBadgeType) -> Result<BadgeType> {
        sqlx::query_as::<_, BadgeType>(
            r#"
            INSERT INTO badge_types (org_id, title, image, is_active, validation_category_id,
                                     validation_threshold, unfinished_template, finished_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, org_id, title, image, is_active, validation_category_id,
                      validation_threshold, unfinished_template, finished_description,
                      created_at, updated_at
            "#,
        )
        .bind(new.org_id)
        .bind(new.title)
        .bind(new.image)
        .bind(new.is_active)
        .bind(new.validation_category_id)
        .bind(new.validation_threshold)
        .bind(new.unfinished_template)
        .bind(new.finished_description)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn save_badge_type(&self, badge_type: &BadgeType) -> Result<BadgeType> {
        sqlx::query_as::<_, BadgeType>(
            r#"
            UPDATE badge_types
            SET title = $1,
                image = $2,
                is_active = $3,
                validation_category_id = $4,
                validation_threshold = $5,
                unfinished_template = $6,
                finished_description = $7,
                updated_at = NOW()
            WHERE id = $8
            RETURNING id, org_id, title, image, is_active, validation_category_id,
                      validation_threshold, unfinished_template, finished_description,
                      created_at, updated_at
            "#,
        )
        .bind(&badge_type.title)
        .bind(&badge_type.image)
        .bind(badge_type.is_active)
        .bind(badge_type.validation_category_id)
        .bind(badge_type.validation_threshold)
        .bind(&badge_type.unfinished_template)
        .bind(&badge_type.finished_description)
        .bind(badge_type.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)?
        .ok_or_else(|| AppError::NotFound(format!("Badge type {} not found", badge_type.id)))
    }

    async fn owned_badge_type_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT badge_type_id FROM user_badges WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load badges of user {}: {:?}", user_id, e);
                AppError::Database(e)
            })
    }

    async fn insert_user_badges(
        &self,
        user_id: i64,
        badge_type_ids: &[i64],
        offered_at: DateTime<Utc>,
    ) -> Result<Vec<UserBadge>> {
        if badge_type_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Rows lost to a concurrent grant are skipped by ON CONFLICT
        let inserted = sqlx::query_as::<_, UserBadge>(
            r#"
            INSERT INTO user_badges (badge_type_id, user_id, offered_at)
            SELECT badge_type_id, $2, $3
            FROM UNNEST($1::BIGINT[]) AS t(badge_type_id)
            ON CONFLICT (badge_type_id, user_id) DO NOTHING
            RETURNING id, badge_type_id, user_id, offered_at
            "#,
        )
        .bind(badge_type_ids.to_vec())
        .bind(user_id)
        .bind(offered_at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to grant badges to user {}: {:?}", user_id, e);
            AppError::Database(e)
        })?;

        // RETURNING order is unspecified
        let mut by_type: HashMap<i64, UserBadge> = inserted
            .into_iter()
            .map(|badge| (badge.badge_type_id, badge))
            .collect();

        Ok(badge_type_ids
            .iter()
            .filter_map(|id| by_type.remove(id))
            .collect())
    }

    async fn list_user_badges(
        &self,
        user_id: i64,
        org_id: Option<i64>,
    ) -> Result<Vec<AwardedBadge>> {
        let badges = sqlx::query_as::<_, UserBadge>(
            r#"
            SELECT ub.id, ub.badge_type_id, ub.user_id, ub.offered_at
            FROM user_badges ub
            JOIN badge_types bt ON bt.id = ub.badge_type_id
            WHERE ub.user_id = $1
              AND bt.is_active = TRUE
              AND ($2::BIGINT IS NULL OR bt.org_id = $2)
            ORDER BY ub.offered_at DESC, ub.id DESC
            "#,
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list badges of user {}: {:?}", user_id, e);
            AppError::Database(e)
        })?;

        let type_ids: Vec<i64> = badges.iter().map(|b| b.badge_type_id).collect();
        let mut badge_types = self.badge_types_by_ids(&type_ids).await?;

        // One grant per type and user, so each type is taken once
        Ok(badges
            .into_iter()
            .filter_map(|badge| {
                let badge_type = badge_types.remove(&badge.badge_type_id)?;
                Some(AwardedBadge { badge, badge_type })
            })
            .collect())
    }

    async fn reset_user_engagement(&self, user_id: i64) -> Result<ResetCounts> {
        let reset_error = |e: sqlx::Error| {
            tracing::error!("Failed to reset engagement of user {}: {:?}", user_id, e);
            AppError::Database(e)
        };

        let mut tx = self.pool.begin().await.map_err(reset_error)?;

        let reads = delete_for_user(&mut *tx, "story_reads", user_id)
            .await
            .map_err(reset_error)?;
        let rewards = delete_for_user(&mut *tx, "story_rewards", user_id)
            .await
            .map_err(reset_error)?;
        let badges = delete_for_user(&mut *tx, "user_badges", user_id)
            .await
            .map_err(reset_error)?;

        tx.commit().await.map_err(reset_error)?;

        Ok(ResetCounts {
            reads,
            rewards,
            badges,
        })
    }
}
