use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::ROLE_STAFF;

/// Caller identity extracted from a validated access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Numeric account id used by every per-user endpoint
    pub user_id: i64,
    pub sub: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Staff may read and modify any user's engagement data
    pub fn is_staff(&self) -> bool {
        self.has_role(ROLE_STAFF)
    }

    /// True when the caller owns the `user_id` resource or is staff
    pub fn can_act_for(&self, user_id: i64) -> bool {
        self.is_staff() || self.user_id == user_id
    }
}

/// Namespaced custom claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomClaims {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub roles: Vec<String>,
}
