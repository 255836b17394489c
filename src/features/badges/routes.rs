use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::badges::handlers;
use crate::features::badges::services::{BadgeTypeService, UserBadgeService};

/// Per-user reads and badges (require authentication)
pub fn user_routes(service: Arc<UserBadgeService>) -> Router {
    Router::new()
        .route(
            "/api/storyreads/user/{user_id}",
            get(handlers::list_user_reads)
                .post(handlers::set_user_read)
                .delete(handlers::reset_user_reads),
        )
        .route(
            "/api/userbadges/user/{user_id}",
            get(handlers::list_user_badges),
        )
        .route(
            "/api/userbadges/user/{user_id}/all",
            get(handlers::get_badge_progress),
        )
        .with_state(service)
}

/// Badge type administration (staff only)
pub fn admin_routes(service: Arc<BadgeTypeService>) -> Router {
    Router::new()
        .route(
            "/api/badgetypes",
            get(handlers::list_badge_types).post(handlers::create_badge_type),
        )
        .route(
            "/api/badgetypes/{id}",
            get(handlers::get_badge_type).patch(handlers::update_badge_type),
        )
        .with_state(service)
}
