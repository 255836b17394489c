use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Row};

use crate::core::database::is_foreign_key_violation;
use crate::core::error::{AppError, Result};
use crate::features::engagement::models::{
    Bookmark, FactKind, Rating, Read, ReadScope, Recorded, Reward, Story, StoryBookmark,
    StoryFact, StoryRating, StoryRead, StoryReward, StorySettings,
};

/// Which facts a list query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactFilter {
    pub user_id: i64,
    pub story_id: Option<i64>,
}

impl FactFilter {
    pub fn new(user_id: i64, story_id: Option<i64>) -> Self {
        Self { user_id, story_id }
    }
}

/// A stored rating together with the story settings holding the new average
#[derive(Debug, Clone)]
pub struct RatedStory {
    pub rating: Recorded<StoryRating>,
    pub settings: StorySettings,
}

/// Storage for stories, story settings and engagement facts.
///
/// Inserts of bookmarks and reads are create-if-absent, ratings and rewards
/// are upserts. Uniqueness per (story, user) is enforced by the store, so a
/// concurrent duplicate comes back with `created = false` instead of an error.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn find_story(&self, story_id: i64) -> Result<Option<Story>>;

    async fn get_or_create_settings(&self, story_id: i64) -> Result<StorySettings>;

    async fn insert_bookmark(&self, story_id: i64, user_id: i64)
        -> Result<Recorded<StoryBookmark>>;

    async fn delete_bookmark(&self, story_id: i64, user_id: i64) -> Result<u64>;

    async fn list_bookmarks(&self, filter: FactFilter) -> Result<Vec<StoryBookmark>>;

    /// Upsert the user's score and store `average` of all the story's scores
    /// as its cached rating, atomically. Ratings of one story are applied one
    /// at a time so the cached value always reflects the committed scores.
    async fn rate_story(
        &self,
        story_id: i64,
        user_id: i64,
        score: i16,
        average: for<'a> fn(&'a [i16]) -> Decimal,
    ) -> Result<RatedStory>;

    async fn list_ratings(&self, filter: FactFilter) -> Result<Vec<StoryRating>>;

    async fn insert_read(&self, story_id: i64, user_id: i64) -> Result<Recorded<StoryRead>>;

    async fn list_reads(&self, filter: FactFilter) -> Result<Vec<StoryRead>>;

    async fn count_reads(&self, user_id: i64, scope: &ReadScope) -> Result<i64>;

    async fn upsert_reward(
        &self,
        story_id: i64,
        user_id: i64,
        points: i16,
    ) -> Result<Recorded<StoryReward>>;

    async fn list_rewards(&self, filter: FactFilter) -> Result<Vec<StoryReward>>;
}

pub struct PgEngagementRepository {
    pool: PgPool,
}

impl PgEngagementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_if_absent<K: FactKind>(
        &self,
        story_id: i64,
        user_id: i64,
    ) -> Result<Recorded<StoryFact<K>>> {
        let insert = format!(
            "INSERT INTO {} (story_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (story_id, user_id) DO NOTHING RETURNING *",
            K::TABLE
        );

        let inserted = sqlx::query_as::<_, StoryFact<K>>(&insert)
            .bind(story_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(K::TABLE, story_id, e))?;

        if let Some(value) = inserted {
            return Ok(Recorded {
                value,
                created: true,
            });
        }

        let select = format!(
            "SELECT * FROM {} WHERE story_id = $1 AND user_id = $2",
            K::TABLE
        );
        let value = sqlx::query_as::<_, StoryFact<K>>(&select)
            .bind(story_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load existing row from {}: {:?}", K::TABLE, e);
                AppError::Database(e)
            })?;

        Ok(Recorded {
            value,
            created: false,
        })
    }

    async fn list<K: FactKind>(&self, filter: FactFilter) -> Result<Vec<StoryFact<K>>> {
        let sql = format!(
            "SELECT * FROM {} WHERE user_id = $1 AND ($2::BIGINT IS NULL OR story_id = $2) \
             ORDER BY created_at DESC, id DESC",
            K::TABLE
        );

        sqlx::query_as::<_, StoryFact<K>>(&sql)
            .bind(filter.user_id)
            .bind(filter.story_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list {}: {:?}", K::TABLE, e);
                AppError::Database(e)
            })
    }
}

/// Insert or overwrite the single value column of a fact
async fn upsert_fact<'e, K, E>(
    executor: E,
    story_id: i64,
    user_id: i64,
    column: &'static str,
    value: i16,
) -> Result<Recorded<StoryFact<K>>>
where
    K: FactKind,
    E: PgExecutor<'e>,
{
    // xmax is 0 only for freshly inserted tuples
    let sql = format!(
        "INSERT INTO {table} (story_id, user_id, {column}) VALUES ($1, $2, $3) \
         ON CONFLICT (story_id, user_id) DO UPDATE SET {column} = EXCLUDED.{column} \
         RETURNING *, (xmax = 0) AS inserted",
        table = K::TABLE,
        column = column,
    );

    let row = sqlx::query(&sql)
        .bind(story_id)
        .bind(user_id)
        .bind(value)
        .fetch_one(executor)
        .await
        .map_err(|e| write_error(K::TABLE, story_id, e))?;

    let fact = <StoryFact<K> as sqlx::FromRow<_>>::from_row(&row)?;
    let created: bool = row.try_get("inserted")?;

    Ok(Recorded {
        value: fact,
        created,
    })
}

fn rating_error(story_id: i64) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("Failed to rate story {}: {:?}", story_id, e);
        AppError::Database(e)
    }
}

/// A story deleted between the existence check and the write shows up as a
/// foreign key violation
fn write_error(table: &str, story_id: i64, e: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&e) {
        return AppError::NotFound(format!("Story {} not found", story_id));
    }
    tracing::error!("Failed to write {}: {:?}", table, e);
    AppError::Database(e)
}

#[async_trait]
impl EngagementRepository for PgEngagementRepository {
    async fn find_story(&self, story_id: i64) -> Result<Option<Story>> {
        sqlx::query_as::<_, Story>(
            r#"
            SELECT id, org_id, category_id, title, is_active, created_at
            FROM stories
            WHERE id = $1
            "#,
        )
        .bind(story_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get story {}: {:?}", story_id, e);
            AppError::Database(e)
        })
    }

    async fn get_or_create_settings(&self, story_id: i64) -> Result<StorySettings> {
        sqlx::query(
            r#"
            INSERT INTO story_settings (story_id)
            VALUES ($1)
            ON CONFLICT (story_id) DO NOTHING
            "#,
        )
        .bind(story_id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("story_settings", story_id, e))?;

        sqlx::query_as::<_, StorySettings>(
            r#"
            SELECT id, story_id, reward_points, display_rating, rating
            FROM story_settings
            WHERE story_id = $1
            "#,
        )
        .bind(story_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get settings of story {}: {:?}", story_id, e);
            AppError::Database(e)
        })
    }

    async fn insert_bookmark(
        &self,
        story_id: i64,
        user_id: i64,
    ) -> Result<Recorded<StoryBookmark>> {
        self.insert_if_absent::<Bookmark>(story_id, user_id).await
    }

    async fn delete_bookmark(&self, story_id: i64, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM story_bookmarks WHERE story_id = $1 AND user_id = $2")
            .bind(story_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete bookmark: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(result.rows_affected())
    }

    async fn list_bookmarks(&self, filter: FactFilter) -> Result<Vec<StoryBookmark>> {
        self.list::<Bookmark>(filter).await
    }

    async fn rate_story(
        &self,
        story_id: i64,
        user_id: i64,
        score: i16,
        average: for<'a> fn(&'a [i16]) -> Decimal,
    ) -> Result<RatedStory> {
        let mut tx = self.pool.begin().await.map_err(rating_error(story_id))?;

        sqlx::query(
            "INSERT INTO story_settings (story_id) VALUES ($1) ON CONFLICT (story_id) DO NOTHING",
        )
        .bind(story_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("story_settings", story_id, e))?;

        // Concurrent ratings of the story wait here until this one commits
        sqlx::query("SELECT id FROM story_settings WHERE story_id = $1 FOR UPDATE")
            .bind(story_id)
            .execute(&mut *tx)
            .await
            .map_err(rating_error(story_id))?;

        let rating = upsert_fact::<Rating, _>(&mut *tx, story_id, user_id, "score", score).await?;

        let scores =
            sqlx::query_scalar::<_, i16>("SELECT score FROM story_ratings WHERE story_id = $1")
                .bind(story_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(rating_error(story_id))?;

        let settings = sqlx::query_as::<_, StorySettings>(
            r#"
            UPDATE story_settings
            SET rating = $2
            WHERE story_id = $1
            RETURNING id, story_id, reward_points, display_rating, rating
            "#,
        )
        .bind(story_id)
        .bind(average(&scores))
        .fetch_one(&mut *tx)
        .await
        .map_err(rating_error(story_id))?;

        tx.commit().await.map_err(rating_error(story_id))?;

        Ok(RatedStory { rating, settings })
    }

    async fn list_ratings(&self, filter: FactFilter) -> Result<Vec<StoryRating>> {
        self.list::<Rating>(filter).await
    }

    async fn insert_read(&self, story_id: i64, user_id: i64) -> Result<Recorded<StoryRead>> {
        self.insert_if_absent::<Read>(story_id, user_id).await
    }

    async fn list_reads(&self, filter: FactFilter) -> Result<Vec<StoryRead>> {
        self.list::<Read>(filter).await
    }

    async fn count_reads(&self, user_id: i64, scope: &ReadScope) -> Result<i64> {
        let query = match scope {
            ReadScope::Organization(org_id) => sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*)
                FROM story_reads r
                JOIN stories s ON s.id = r.story_id
                WHERE r.user_id = $1 AND s.org_id = $2
                "#,
            )
            .bind(user_id)
            .bind(*org_id),
            ReadScope::Categories(category_ids) => sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*)
                FROM story_reads r
                JOIN stories s ON s.id = r.story_id
                WHERE r.user_id = $1 AND s.category_id = ANY($2)
                "#,
            )
            .bind(user_id)
            .bind(category_ids.clone()),
        };

        query.fetch_one(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to count reads for user {}: {:?}", user_id, e);
            AppError::Database(e)
        })
    }

    async fn upsert_reward(
        &self,
        story_id: i64,
        user_id: i64,
        points: i16,
    ) -> Result<Recorded<StoryReward>> {
        upsert_fact::<Reward, _>(&self.pool, story_id, user_id, "points", points).await
    }

    async fn list_rewards(&self, filter: FactFilter) -> Result<Vec<StoryReward>> {
        self.list::<Reward>(filter).await
    }
}
