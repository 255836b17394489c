use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::engagement::handlers;
use crate::features::engagement::services::EngagementService;

/// Per-user engagement routes (require authentication)
pub fn routes(service: Arc<EngagementService>) -> Router {
    Router::new()
        .route(
            "/api/storybookmarks/user/{user_id}",
            get(handlers::list_user_bookmarks)
                .post(handlers::create_user_bookmark)
                .delete(handlers::remove_user_bookmark),
        )
        .route(
            "/api/storyratings/user/{user_id}",
            get(handlers::list_user_ratings).post(handlers::set_user_rating),
        )
        .route(
            "/api/storyrewards/user/{user_id}",
            get(handlers::list_user_rewards).post(handlers::set_user_reward),
        )
        .with_state(service)
}

/// Story settings are readable without authentication
pub fn public_routes(service: Arc<EngagementService>) -> Router {
    Router::new()
        .route(
            "/api/storysettings/story/{story_id}",
            get(handlers::get_story_settings),
        )
        .with_state(service)
}
