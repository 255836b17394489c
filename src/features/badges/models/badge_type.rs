use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::shared::constants::STORY_NOUN;
use crate::shared::template::{pluralize, safe_substitute};

/// Organization-defined badge earned by reading enough stories
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BadgeType {
    pub id: i64,
    pub org_id: i64,
    pub title: String,
    /// Opaque image URL
    pub image: Option<String>,
    /// Inactive types are never awarded nor listed to users
    pub is_active: bool,
    /// `None` counts every story of the organization
    pub validation_category_id: Option<i64>,
    pub validation_threshold: i32,
    pub unfinished_template: String,
    pub finished_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stories whose reads count toward a badge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeScope {
    /// Badge types without a validation category
    OrganizationWide,
    /// Badge types validated against exactly this category
    Category(i64),
}

impl BadgeType {
    pub fn scope(&self) -> BadgeScope {
        match self.validation_category_id {
            Some(category_id) => BadgeScope::Category(category_id),
            None => BadgeScope::OrganizationWide,
        }
    }

    /// Reads still missing, never negative
    pub fn left_count(&self, read_count: i64) -> i64 {
        (i64::from(self.validation_threshold) - read_count).max(0)
    }

    /// Text shown to a user: the fixed description once owned, otherwise the
    /// progress template with `read_count`, `left_count`,
    /// `pluralize_stories_read` and `pluralize_stories_left` filled in
    pub fn description(&self, read_count: i64, owned: bool) -> String {
        if owned {
            return self.finished_description.clone();
        }

        let left_count = self.left_count(read_count);
        let (singular, plural) = STORY_NOUN;
        let values = HashMap::from([
            ("read_count", read_count.to_string()),
            ("left_count", left_count.to_string()),
            (
                "pluralize_stories_read",
                pluralize(read_count, singular, plural).to_string(),
            ),
            (
                "pluralize_stories_left",
                pluralize(left_count, singular, plural).to_string(),
            ),
        ]);

        safe_substitute(&self.unfinished_template, &values)
    }
}
