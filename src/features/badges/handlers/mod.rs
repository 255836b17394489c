mod badge_type_handler;
mod user_badge_handler;

pub use badge_type_handler::*;
pub use user_badge_handler::*;
