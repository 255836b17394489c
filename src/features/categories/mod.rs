//! Story categories and their two-level hierarchy.
//!
//! A category whose name contains the configured separator (default "/") is a
//! subcategory: "Health / Nutrition" belongs to "Health" of the same
//! organization. Deeper nesting is not modelled, so "A / B / C" also resolves
//! to "A".
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/categories/org/{org_id}` | List an organization's categories |
//! | GET | `/api/categories/{id}` | Category with parent and subcategory ids |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use repository::{CategoryRepository, PgCategoryRepository};
pub use services::CategoryService;
