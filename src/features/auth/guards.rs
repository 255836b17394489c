//! Authorization guards.
//!
//! Per-user endpoints (`/user/{user_id}`) are open to the owner of that id and
//! to staff. Badge-type administration is staff only.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Reject unless the caller owns `user_id` or is staff
pub fn ensure_owner_or_staff(user: &AuthenticatedUser, user_id: i64) -> Result<(), AppError> {
    if user.can_act_for(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You may only access your own engagement data".to_string(),
        ))
    }
}

/// Extractor guard for staff-only handlers
///
/// ```ignore
/// pub async fn handler(RequireStaff(user): RequireStaff) { ... }
/// ```
pub struct RequireStaff(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        if !user.is_staff() {
            return Err(AppError::Forbidden("Staff access required".to_string()));
        }

        Ok(RequireStaff(user.clone()))
    }
}
