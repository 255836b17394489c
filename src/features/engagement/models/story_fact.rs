//! Per-user, per-story engagement facts.
//!
//! Bookmarks, ratings, reads and rewards share the same shape and the same
//! uniqueness rule (one row per story and user in each table). They differ only
//! in the table they live in and the extra column they carry, which is what
//! [`FactKind`] describes.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// A fact kind: its table and its kind-specific columns
pub trait FactKind: Clone + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryFact<K> {
    pub id: i64,
    pub story_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub detail: K,
}

impl<'r, K: FactKind> FromRow<'r, PgRow> for StoryFact<K> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            story_id: row.try_get("story_id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            detail: K::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating {
    pub score: i16,
}

/// First time the user opened the story; never updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reward {
    pub points: i16,
}

impl FactKind for Bookmark {
    const TABLE: &'static str = "story_bookmarks";

    fn from_row(_row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Bookmark)
    }
}

impl FactKind for Rating {
    const TABLE: &'static str = "story_ratings";

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Rating {
            score: row.try_get("score")?,
        })
    }
}

impl FactKind for Read {
    const TABLE: &'static str = "story_reads";

    fn from_row(_row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Read)
    }
}

impl FactKind for Reward {
    const TABLE: &'static str = "story_rewards";

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Reward {
            points: row.try_get("points")?,
        })
    }
}

pub type StoryBookmark = StoryFact<Bookmark>;
pub type StoryRating = StoryFact<Rating>;
pub type StoryRead = StoryFact<Read>;
pub type StoryReward = StoryFact<Reward>;

/// Which stories a read count covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    /// Every story of the organization
    Organization(i64),
    /// Stories filed under any of these categories
    Categories(Vec<i64>),
}

/// Result of a create-if-absent or upsert write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
    pub value: T,
    /// False when the row already existed
    pub created: bool,
}
