use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppPath, AppQuery};
use crate::features::auth::guards::ensure_owner_or_staff;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::engagement::dtos::{
    BookmarkResponseDto, DeletedCountDto, RateStoryDto, RatingResponseDto, RewardResponseDto,
    RewardStoryDto, StoryFilterQuery, StoryRefDto,
};
use crate::features::engagement::models::{Recorded, StorySettings};
use crate::features::engagement::services::EngagementService;
use crate::shared::types::ApiResponse;

type CreatedOrOk<T> = (StatusCode, Json<ApiResponse<T>>);

/// 201 for a new record, 200 when it already existed
fn created_or_ok<T, D: From<T>>(recorded: Recorded<T>) -> CreatedOrOk<D> {
    let status = if recorded.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(ApiResponse::success(Some(recorded.value.into()), None, None)),
    )
}

// ==================== Bookmarks ====================

/// List a user's bookmarks
#[utoipa::path(
    get,
    path = "/api/storybookmarks/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id"),
        StoryFilterQuery
    ),
    responses(
        (status = 200, description = "Bookmarks, newest first", body = ApiResponse<Vec<BookmarkResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner or staff")
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn list_user_bookmarks(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(query): AppQuery<StoryFilterQuery>,
) -> Result<Json<ApiResponse<Vec<BookmarkResponseDto>>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let bookmarks = service.list_bookmarks(user_id, query.story).await?;
    let dtos: Vec<BookmarkResponseDto> = bookmarks.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::list(dtos)))
}

/// Bookmark a story
#[utoipa::path(
    post,
    path = "/api/storybookmarks/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    request_body = StoryRefDto,
    responses(
        (status = 201, description = "Bookmark created", body = ApiResponse<BookmarkResponseDto>),
        (status = 200, description = "Story was already bookmarked", body = ApiResponse<BookmarkResponseDto>),
        (status = 404, description = "Story not found")
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn create_user_bookmark(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppJson(dto): AppJson<StoryRefDto>,
) -> Result<CreatedOrOk<BookmarkResponseDto>> {
    ensure_owner_or_staff(&user, user_id)?;

    let bookmark = service.record_bookmark(user_id, dto.story).await?;
    Ok(created_or_ok(bookmark))
}

/// Remove a story bookmark
#[utoipa::path(
    delete,
    path = "/api/storybookmarks/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    request_body = StoryRefDto,
    responses(
        (status = 200, description = "Number of removed bookmarks", body = ApiResponse<DeletedCountDto>),
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn remove_user_bookmark(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppJson(dto): AppJson<StoryRefDto>,
) -> Result<Json<ApiResponse<DeletedCountDto>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let count = service.remove_bookmark(user_id, dto.story).await?;
    Ok(Json(ApiResponse::success(
        Some(DeletedCountDto { count }),
        None,
        None,
    )))
}

// ==================== Ratings ====================

/// List a user's ratings
#[utoipa::path(
    get,
    path = "/api/storyratings/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id"),
        StoryFilterQuery
    ),
    responses(
        (status = 200, description = "Ratings, newest first", body = ApiResponse<Vec<RatingResponseDto>>),
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn list_user_ratings(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(query): AppQuery<StoryFilterQuery>,
) -> Result<Json<ApiResponse<Vec<RatingResponseDto>>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let ratings = service.list_ratings(user_id, query.story).await?;
    let dtos: Vec<RatingResponseDto> = ratings.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::list(dtos)))
}

/// Rate a story (1 to 5); rating again replaces the score
#[utoipa::path(
    post,
    path = "/api/storyratings/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    request_body = RateStoryDto,
    responses(
        (status = 201, description = "Rating created", body = ApiResponse<RatingResponseDto>),
        (status = 200, description = "Rating updated", body = ApiResponse<RatingResponseDto>),
        (status = 400, description = "Score out of range"),
        (status = 404, description = "Story not found")
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn set_user_rating(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppJson(dto): AppJson<RateStoryDto>,
) -> Result<CreatedOrOk<RatingResponseDto>> {
    ensure_owner_or_staff(&user, user_id)?;

    let rating = service.rate(user_id, dto).await?;
    Ok(created_or_ok(rating))
}

// ==================== Rewards ====================

/// List the rewards a user received
#[utoipa::path(
    get,
    path = "/api/storyrewards/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id"),
        StoryFilterQuery
    ),
    responses(
        (status = 200, description = "Rewards, newest first", body = ApiResponse<Vec<RewardResponseDto>>),
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn list_user_rewards(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(query): AppQuery<StoryFilterQuery>,
) -> Result<Json<ApiResponse<Vec<RewardResponseDto>>>> {
    ensure_owner_or_staff(&user, user_id)?;

    let rewards = service.list_rewards(user_id, query.story).await?;
    let dtos: Vec<RewardResponseDto> = rewards.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::list(dtos)))
}

/// Grant reward points for a story (0 to 100, defaults to the story's points)
#[utoipa::path(
    post,
    path = "/api/storyrewards/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    request_body = RewardStoryDto,
    responses(
        (status = 201, description = "Reward created", body = ApiResponse<RewardResponseDto>),
        (status = 200, description = "Reward updated", body = ApiResponse<RewardResponseDto>),
        (status = 400, description = "Points out of range"),
        (status = 404, description = "Story not found")
    ),
    tag = "engagement",
    security(("bearer_auth" = []))
)]
pub async fn set_user_reward(
    user: AuthenticatedUser,
    State(service): State<Arc<EngagementService>>,
    AppPath(user_id): AppPath<i64>,
    AppJson(dto): AppJson<RewardStoryDto>,
) -> Result<CreatedOrOk<RewardResponseDto>> {
    ensure_owner_or_staff(&user, user_id)?;

    let reward = service.grant_reward(user_id, dto).await?;
    Ok(created_or_ok(reward))
}

// ==================== Settings ====================

/// Story settings, created with defaults on first access
#[utoipa::path(
    get,
    path = "/api/storysettings/story/{story_id}",
    params(
        ("story_id" = i64, Path, description = "Story id")
    ),
    responses(
        (status = 200, description = "Story settings", body = ApiResponse<StorySettings>),
        (status = 404, description = "Story not found")
    ),
    tag = "engagement"
)]
pub async fn get_story_settings(
    State(service): State<Arc<EngagementService>>,
    AppPath(story_id): AppPath<i64>,
) -> Result<Json<ApiResponse<StorySettings>>> {
    let settings = service.story_settings(story_id).await?;
    Ok(Json(ApiResponse::success(Some(settings), None, None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engagement::routes;
    use crate::shared::test_helpers::{reader, with_user_auth, InMemoryStore};
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn app(store: &InMemoryStore) -> Router {
        let service = Arc::new(EngagementService::new(Arc::new(store.clone())));
        routes::routes(Arc::clone(&service)).merge(routes::public_routes(service))
    }

    fn server_as(store: &InMemoryStore, user: AuthenticatedUser) -> TestServer {
        TestServer::new(with_user_auth(app(store), user)).unwrap()
    }

    #[tokio::test]
    async fn test_bookmark_created_then_ok() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let server = server_as(&store, reader(321));

        let first = server
            .post("/api/storybookmarks/user/321")
            .json(&json!({ "story": story.id }))
            .await;
        first.assert_status(StatusCode::CREATED);

        let second = server
            .post("/api/storybookmarks/user/321")
            .json(&json!({ "story": story.id }))
            .await;
        second.assert_status_ok();

        let removed = server
            .delete("/api/storybookmarks/user/321")
            .json(&json!({ "story": story.id }))
            .await;
        let body: Value = removed.json();
        assert_eq!(body["data"]["count"], 1);
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_field_error() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let server = server_as(&store, reader(321));

        let response = server
            .post("/api/storyratings/user/321")
            .json(&json!({ "story": story.id, "score": 7 }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0], "score: Score must be between 1 and 5");
    }

    #[tokio::test]
    async fn test_values_beyond_smallint_are_field_errors() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let server = server_as(&store, reader(321));

        let rating = server
            .post("/api/storyratings/user/321")
            .json(&json!({ "story": story.id, "score": 40000 }))
            .await;
        rating.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = rating.json();
        assert_eq!(body["errors"][0], "score: Score must be between 1 and 5");

        let reward = server
            .post("/api/storyrewards/user/321")
            .json(&json!({ "story": story.id, "points": 40000 }))
            .await;
        reward.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = reward.json();
        assert_eq!(body["errors"][0], "points: Points must be between 0 and 100");
    }

    #[tokio::test]
    async fn test_other_users_data_is_forbidden() {
        let store = InMemoryStore::new();
        let server = server_as(&store, reader(321));

        let response = server.get("/api/storyratings/user/322").await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_story_settings_show_cached_rating() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let server = server_as(&store, reader(321));

        server
            .post("/api/storyratings/user/321")
            .json(&json!({ "story": story.id, "score": 5 }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/api/storysettings/story/{}", story.id))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["rating"], "5.00");
        assert_eq!(body["data"]["story"], story.id);
    }

    #[tokio::test]
    async fn test_reward_list_filters_by_story() {
        let store = InMemoryStore::new();
        let s1 = store.add_story(1, None);
        let s2 = store.add_story(1, None);
        let server = server_as(&store, reader(321));

        for story in [&s1, &s2] {
            server
                .post("/api/storyrewards/user/321")
                .json(&json!({ "story": story.id, "points": 10 }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server
            .get(&format!("/api/storyrewards/user/321?story={}", s2.id))
            .await;
        let body: Value = response.json();
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["data"][0]["story"], s2.id);
    }
}
