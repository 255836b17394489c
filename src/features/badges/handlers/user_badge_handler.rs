use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppPath, AppQuery};
use crate::features::auth::guards::ensure_owner_or_staff;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::badges::dtos::{
    BadgeProgressDto, OrgFilterQuery, ResetCountsDto, UserBadgeResponseDto,
};
use crate::features::badges::services::UserBadgeService;
use crate::features::engagement::dtos::{ReadResponseDto, StoryFilterQuery, StoryRefDto};
use crate::shared::types::ApiResponse;

// ==================== Reads ====================

/// List the stories a user has read
#[utoipa::path(
    get,
    path = "/api/storyreads/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id"),
        StoryFilterQuery
    ),
    responses(
        (status = 200, description = "Reads, newest first", body = ApiResponse<Vec<ReadResponseDto>>),
        (status = 403, description = "Not the owner or staff")
    ),
    tag = "badges",
    security(("bearer_auth" = []))
)]
pub async fn list_user_reads(
    user: AuthenticatedUser,
    State(service): State<Arc<UserBadgeService>>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(query): AppQuery<StoryFilterQuery>,
) -> Result<Json<ApiResponse<Vec<ReadResponseDto>>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let reads = service.list_user_reads(user_id, query.story).await?;
    Ok(Json(ApiResponse::list(reads)))
}

/// Mark a story as read and return the newly earned badges
#[utoipa::path(
    post,
    path = "/api/storyreads/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    request_body = StoryRefDto,
    responses(
        (status = 201, description = "First read; badges earned by it", body = ApiResponse<Vec<UserBadgeResponseDto>>),
        (status = 200, description = "Story was already read; badges earned by it", body = ApiResponse<Vec<UserBadgeResponseDto>>),
        (status = 404, description = "Story not found")
    ),
    tag = "badges",
    security(("bearer_auth" = []))
)]
pub async fn set_user_read(
    user: AuthenticatedUser,
    State(service): State<Arc<UserBadgeService>>,
    AppPath(user_id): AppPath<i64>,
    AppJson(dto): AppJson<StoryRefDto>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<UserBadgeResponseDto>>>)> {
    ensure_owner_or_staff(&user, user_id)?;

    let outcome = service.mark_story_read(user_id, dto.story).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let badges: Vec<UserBadgeResponseDto> = outcome.badges.into_iter().map(Into::into).collect();

    Ok((status, Json(ApiResponse::list(badges))))
}

/// Delete the user's reads, rewards and badges
#[utoipa::path(
    delete,
    path = "/api/storyreads/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Number of deleted rows per kind", body = ApiResponse<ResetCountsDto>),
        (status = 403, description = "Not the owner or staff")
    ),
    tag = "badges",
    security(("bearer_auth" = []))
)]
pub async fn reset_user_reads(
    user: AuthenticatedUser,
    State(service): State<Arc<UserBadgeService>>,
    AppPath(user_id): AppPath<i64>,
) -> Result<Json<ApiResponse<ResetCountsDto>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let counts = service.reset_user_engagement(user_id).await?;
    Ok(Json(ApiResponse::success(Some(counts), None, None)))
}

// ==================== Badges ====================

/// Badges owned by a user, newest first
#[utoipa::path(
    get,
    path = "/api/userbadges/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id"),
        OrgFilterQuery
    ),
    responses(
        (status = 200, description = "Owned badges", body = ApiResponse<Vec<UserBadgeResponseDto>>),
    ),
    tag = "badges",
    security(("bearer_auth" = []))
)]
pub async fn list_user_badges(
    user: AuthenticatedUser,
    State(service): State<Arc<UserBadgeService>>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(query): AppQuery<OrgFilterQuery>,
) -> Result<Json<ApiResponse<Vec<UserBadgeResponseDto>>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let badges = service.list_user_badges(user_id, query.org).await?;
    Ok(Json(ApiResponse::list(badges)))
}

/// Every active badge type with the user's progress toward it
#[utoipa::path(
    get,
    path = "/api/userbadges/user/{user_id}/all",
    params(
        ("user_id" = i64, Path, description = "User id"),
        OrgFilterQuery
    ),
    responses(
        (status = 200, description = "Badge progress in catalog order", body = ApiResponse<Vec<BadgeProgressDto>>),
    ),
    tag = "badges",
    security(("bearer_auth" = []))
)]
pub async fn get_badge_progress(
    user: AuthenticatedUser,
    State(service): State<Arc<UserBadgeService>>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(query): AppQuery<OrgFilterQuery>,
) -> Result<Json<ApiResponse<Vec<BadgeProgressDto>>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let progress = service.get_badge_progress(user_id, query.org).await?;
    Ok(Json(ApiResponse::list(progress)))
}
