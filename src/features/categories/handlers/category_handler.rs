use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::core::extractor::AppPath;
use crate::features::categories::dtos::{CategoryDetailDto, CategoryResponseDto};
use crate::features::categories::services::CategoryService;
use crate::shared::types::ApiResponse;

/// List the active categories of an organization
#[utoipa::path(
    get,
    path = "/api/categories/org/{org_id}",
    params(
        ("org_id" = i64, Path, description = "Organization id")
    ),
    responses(
        (status = 200, description = "Categories ordered by name", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_org_categories(
    State(service): State<Arc<CategoryService>>,
    AppPath(org_id): AppPath<i64>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.list_by_org(org_id).await?;
    Ok(Json(ApiResponse::list(categories)))
}

/// Get a category with its parent and subcategory ids
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryDetailDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<CategoryDetailDto>>> {
    let category = service.detail(id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}
