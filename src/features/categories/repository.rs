use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;

/// Read access to categories; writes happen in the content management side
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Exact name match within one organization
    async fn find_by_name(&self, org_id: i64, name: &str) -> Result<Option<Category>>;

    /// Ids of the organization's categories whose name starts with `prefix`
    async fn find_ids_by_name_prefix(&self, org_id: i64, prefix: &str) -> Result<Vec<i64>>;

    async fn list_by_org(&self, org_id: i64) -> Result<Vec<Category>>;
}

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, org_id, name, is_active, created_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get category {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn find_by_name(&self, org_id: i64, name: &str) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, org_id, name, is_active, created_at
            FROM categories
            WHERE org_id = $1 AND name = $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(org_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get category by name: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find_ids_by_name_prefix(&self, org_id: i64, prefix: &str) -> Result<Vec<i64>> {
        // starts_with() avoids LIKE so '%' and '_' in names match literally
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM categories
            WHERE org_id = $1 AND starts_with(name, $2)
            ORDER BY id
            "#,
        )
        .bind(org_id)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list subcategory ids: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn list_by_org(&self, org_id: i64) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, org_id, name, is_active, created_at
            FROM categories
            WHERE org_id = $1 AND is_active = TRUE
            ORDER BY name
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::Database(e)
        })
    }
}
