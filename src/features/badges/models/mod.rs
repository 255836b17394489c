mod badge_type;
mod user_badge;

pub use badge_type::{BadgeScope, BadgeType};
pub use user_badge::{AwardedBadge, BadgeProgressContext, UserBadge};
