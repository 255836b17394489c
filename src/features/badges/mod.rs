//! Badges earned by reading stories.
//!
//! Badge types are defined per organization with a read threshold and an
//! optional validation category. After every story read the award engine
//! counts the user's reads in three scopes and grants each newly reached
//! badge type:
//!
//! - organization-wide types (no category) count every read in the organization
//! - types of the story's category count reads in that exact category
//! - types of the parent category count reads in the parent and all of its
//!   direct subcategories
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/storyreads/user/{user_id}` | List reads |
//! | POST | `/api/storyreads/user/{user_id}` | Mark a story read, returns new badges |
//! | DELETE | `/api/storyreads/user/{user_id}` | Reset reads, rewards and badges |
//! | GET | `/api/userbadges/user/{user_id}` | Owned badges |
//! | GET | `/api/userbadges/user/{user_id}/all` | Progress toward every badge |
//! | GET/POST | `/api/badgetypes` | List or create badge types (staff) |
//! | GET/PATCH | `/api/badgetypes/{id}` | Read or update a badge type (staff) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use repository::{BadgeRepository, PgBadgeRepository};
pub use services::{BadgeAwardEngine, BadgeCatalog, BadgeTypeService, UserBadgeService};
