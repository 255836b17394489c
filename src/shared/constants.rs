/// Separator used when SUBCATEGORY_SEPARATOR is not configured
pub const DEFAULT_SUBCATEGORY_SEPARATOR: &str = "/";

/// Staff role - may act on behalf of any user and manage badge types
pub const ROLE_STAFF: &str = "staff";

/// Badge types are created inactive until an editor enables them
pub const DEFAULT_BADGE_IS_ACTIVE: bool = false;

/// Threshold given to new badge types when none is provided
pub const DEFAULT_BADGE_THRESHOLD: i32 = 10_000;

/// Upper bound for `validation_threshold`
pub const MAX_BADGE_THRESHOLD: i32 = 10_000;

/// Noun used when pluralizing read counts in badge descriptions
pub const STORY_NOUN: (&str, &str) = ("story", "stories");
