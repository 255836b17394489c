//! Story engagement ledger.
//!
//! Records what a user did with a story: bookmarks, ratings (1 to 5), the
//! first read and reward points. Each kind holds at most one row per story and
//! user. Rating a story refreshes the cached average on its settings.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET/POST/DELETE | `/api/storybookmarks/user/{user_id}` | List, add or remove bookmarks |
//! | GET/POST | `/api/storyratings/user/{user_id}` | List or set ratings |
//! | GET/POST | `/api/storyrewards/user/{user_id}` | List or grant rewards |
//! | GET | `/api/storysettings/story/{story_id}` | Story settings (public) |
//!
//! Reads are recorded through the badges feature, which evaluates badge
//! awards on every read.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use repository::{EngagementRepository, PgEngagementRepository};
pub use services::EngagementService;
