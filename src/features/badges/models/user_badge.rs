use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::badge_type::BadgeType;

/// A badge granted to a user; granted at most once and never revoked
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserBadge {
    pub id: i64,
    pub badge_type_id: i64,
    pub user_id: i64,
    pub offered_at: DateTime<Utc>,
}

/// A grant together with its badge type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardedBadge {
    pub badge: UserBadge,
    pub badge_type: BadgeType,
}

/// Everything needed to describe badges for one user
#[derive(Debug, Clone, Default)]
pub struct BadgeProgressContext {
    pub user_id: i64,
    /// Restricts the catalog to one organization when set
    pub org_id: Option<i64>,
    pub owned_ids: HashSet<i64>,
}

impl BadgeProgressContext {
    pub fn owns(&self, badge_type_id: i64) -> bool {
        self.owned_ids.contains(&badge_type_id)
    }

    pub fn describe(&self, badge_type: &BadgeType, read_count: i64) -> String {
        badge_type.description(read_count, self.owns(badge_type.id))
    }
}
