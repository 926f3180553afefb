//! Repository for the `categories` table.

use async_trait::async_trait;
use posterboard_core::types::{new_id, DbId};

use crate::error::StoreError;
use crate::models::category::Category;
use crate::store::CategoryStore;
use crate::DbPool;

/// Column list for `categories` queries.
const COLUMNS: &str = "id, name, created_at, updated_at";

/// PostgreSQL-backed [`CategoryStore`].
#[derive(Debug, Clone)]
pub struct CategoryRepo {
    pool: DbPool,
}

impl CategoryRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for CategoryRepo {
    async fn create(&self, name: &str) -> Result<Category, StoreError> {
        let query = format!(
            "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(new_id())
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM categories ORDER BY created_at, id");
        let categories = sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Category>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn update(&self, id: DbId, name: &str) -> Result<Option<Category>, StoreError> {
        let query = format!(
            "UPDATE categories SET name = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
