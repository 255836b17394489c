use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Story category owned by an organization.
///
/// Only two levels exist and they are encoded in `name`:
/// "Health / Nutrition" is a subcategory of "Health" when the separator is "/".
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Category {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn is_subcategory(&self, separator: &str) -> bool {
        self.name.contains(separator)
    }

    /// Trimmed text before the first separator, if the name has one
    pub fn parent_name(&self, separator: &str) -> Option<&str> {
        self.name
            .split_once(separator)
            .map(|(prefix, _)| prefix.trim())
    }

    /// Name prefix shared by this category's direct subcategories.
    ///
    /// The single space before the separator is part of the convention:
    /// "Health" groups "Health / Nutrition" but not "Health/Nutrition".
    pub fn subcategory_prefix(&self, separator: &str) -> String {
        format!("{} {}", self.name, separator)
    }
}
