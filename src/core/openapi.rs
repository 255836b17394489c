use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::badges::{dtos as badges_dtos, handlers as badges_handlers};
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::engagement::{
    dtos as engagement_dtos, handlers as engagement_handlers, models as engagement_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories (public)
        categories_handlers::list_org_categories,
        categories_handlers::get_category,
        // Story engagement
        engagement_handlers::list_user_bookmarks,
        engagement_handlers::create_user_bookmark,
        engagement_handlers::remove_user_bookmark,
        engagement_handlers::list_user_ratings,
        engagement_handlers::set_user_rating,
        engagement_handlers::list_user_rewards,
        engagement_handlers::set_user_reward,
        engagement_handlers::get_story_settings,
        // Reads and badges
        badges_handlers::list_user_reads,
        badges_handlers::set_user_read,
        badges_handlers::reset_user_reads,
        badges_handlers::list_user_badges,
        badges_handlers::get_badge_progress,
        // Badge types (staff)
        badges_handlers::list_badge_types,
        badges_handlers::get_badge_type,
        badges_handlers::create_badge_type,
        badges_handlers::update_badge_type,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Categories
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryDetailDto,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryDetailDto>,
            // Story engagement
            engagement_models::StorySettings,
            engagement_dtos::StoryRefDto,
            engagement_dtos::RateStoryDto,
            engagement_dtos::RewardStoryDto,
            engagement_dtos::BookmarkResponseDto,
            engagement_dtos::RatingResponseDto,
            engagement_dtos::ReadResponseDto,
            engagement_dtos::RewardResponseDto,
            engagement_dtos::DeletedCountDto,
            ApiResponse<Vec<engagement_dtos::BookmarkResponseDto>>,
            ApiResponse<engagement_dtos::BookmarkResponseDto>,
            ApiResponse<Vec<engagement_dtos::RatingResponseDto>>,
            ApiResponse<engagement_dtos::RatingResponseDto>,
            ApiResponse<Vec<engagement_dtos::ReadResponseDto>>,
            ApiResponse<Vec<engagement_dtos::RewardResponseDto>>,
            ApiResponse<engagement_dtos::RewardResponseDto>,
            ApiResponse<engagement_dtos::DeletedCountDto>,
            ApiResponse<engagement_models::StorySettings>,
            // Badges
            badges_dtos::BadgeTypeDto,
            badges_dtos::UserBadgeResponseDto,
            badges_dtos::BadgeProgressDto,
            badges_dtos::ResetCountsDto,
            badges_dtos::BadgeTypeAdminDto,
            badges_dtos::CreateBadgeTypeDto,
            badges_dtos::UpdateBadgeTypeDto,
            ApiResponse<Vec<badges_dtos::UserBadgeResponseDto>>,
            ApiResponse<Vec<badges_dtos::BadgeProgressDto>>,
            ApiResponse<badges_dtos::ResetCountsDto>,
            ApiResponse<Vec<badges_dtos::BadgeTypeAdminDto>>,
            ApiResponse<badges_dtos::BadgeTypeAdminDto>,
        )
    ),
    tags(
        (name = "categories", description = "Story categories (public)"),
        (name = "engagement", description = "Story bookmarks, ratings, rewards and settings"),
        (name = "badges", description = "Story reads and the badges they earn"),
        (name = "badge-types", description = "Badge type administration (staff only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "U-Report Engagement API",
        version = "0.1.0",
        description = "Story engagement and badge awards",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Title, version and description taken from configuration
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
