use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppPath, AppQuery};
use crate::features::auth::guards::RequireStaff;
use crate::features::badges::dtos::{
    BadgeTypeAdminDto, CreateBadgeTypeDto, OrgFilterQuery, UpdateBadgeTypeDto,
};
use crate::features::badges::services::BadgeTypeService;
use crate::shared::types::ApiResponse;

/// List badge types, inactive ones included
#[utoipa::path(
    get,
    path = "/api/badgetypes",
    params(OrgFilterQuery),
    responses(
        (status = 200, description = "Badge types ordered by threshold", body = ApiResponse<Vec<BadgeTypeAdminDto>>),
        (status = 403, description = "Staff access required")
    ),
    tag = "badge-types",
    security(("bearer_auth" = []))
)]
pub async fn list_badge_types(
    RequireStaff(_user): RequireStaff,
    State(service): State<Arc<BadgeTypeService>>,
    AppQuery(query): AppQuery<OrgFilterQuery>,
) -> Result<Json<ApiResponse<Vec<BadgeTypeAdminDto>>>> {
    let badge_types = service.list(query.org).await?;
    Ok(Json(ApiResponse::list(badge_types)))
}

#[utoipa::path(
    get,
    path = "/api/badgetypes/{id}",
    params(
        ("id" = i64, Path, description = "Badge type id")
    ),
    responses(
        (status = 200, description = "Badge type", body = ApiResponse<BadgeTypeAdminDto>),
        (status = 404, description = "Badge type not found")
    ),
    tag = "badge-types",
    security(("bearer_auth" = []))
)]
pub async fn get_badge_type(
    RequireStaff(_user): RequireStaff,
    State(service): State<Arc<BadgeTypeService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<BadgeTypeAdminDto>>> {
    let badge_type = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(badge_type), None, None)))
}

/// Create a badge type; new types are inactive unless stated otherwise
#[utoipa::path(
    post,
    path = "/api/badgetypes",
    request_body = CreateBadgeTypeDto,
    responses(
        (status = 201, description = "Badge type created", body = ApiResponse<BadgeTypeAdminDto>),
        (status = 400, description = "Invalid fields"),
        (status = 409, description = "Title already used in the organization")
    ),
    tag = "badge-types",
    security(("bearer_auth" = []))
)]
pub async fn create_badge_type(
    RequireStaff(user): RequireStaff,
    State(service): State<Arc<BadgeTypeService>>,
    AppJson(dto): AppJson<CreateBadgeTypeDto>,
) -> Result<(StatusCode, Json<ApiResponse<BadgeTypeAdminDto>>)> {
    tracing::debug!(staff_user_id = user.user_id, "Creating badge type");
    let badge_type = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(badge_type), None, None)),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/badgetypes/{id}",
    params(
        ("id" = i64, Path, description = "Badge type id")
    ),
    request_body = UpdateBadgeTypeDto,
    responses(
        (status = 200, description = "Badge type updated", body = ApiResponse<BadgeTypeAdminDto>),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Badge type not found"),
        (status = 409, description = "Title already used in the organization")
    ),
    tag = "badge-types",
    security(("bearer_auth" = []))
)]
pub async fn update_badge_type(
    RequireStaff(_user): RequireStaff,
    State(service): State<Arc<BadgeTypeService>>,
    AppPath(id): AppPath<i64>,
    AppJson(dto): AppJson<UpdateBadgeTypeDto>,
) -> Result<Json<ApiResponse<BadgeTypeAdminDto>>> {
    let badge_type = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(badge_type), None, None)))
}
