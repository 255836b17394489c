mod award_engine;
mod badge_catalog;
mod badge_type_service;
mod user_badge_service;

pub use award_engine::BadgeAwardEngine;
pub use badge_catalog::BadgeCatalog;
pub use badge_type_service::BadgeTypeService;
pub use user_badge_service::UserBadgeService;
