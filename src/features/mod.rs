pub mod auth;
pub mod badges;
pub mod categories;
pub mod engagement;
