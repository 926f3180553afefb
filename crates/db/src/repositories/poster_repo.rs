//! Repository for the `posters` table.
//!
//! Every read joins `categories` so posters come back with their category.
//! Writes go through a data-modifying CTE and join the returned row, which
//! keeps create/update to a single round trip.

use async_trait::async_trait;
use posterboard_core::types::{new_id, DbId};

use crate::error::StoreError;
use crate::models::poster::{
    NewPoster, Poster, PosterChanges, PosterRow, UpdatedPoster, UpdatedPosterRow,
};
use crate::store::PosterStore;
use crate::DbPool;

/// Select list for a poster row joined with its category (`p` / `c` aliases).
const JOINED_COLUMNS: &str = "\
    p.id, p.category_id, p.image, p.created_at, p.updated_at, \
    c.name AS category_name, \
    c.created_at AS category_created_at, \
    c.updated_at AS category_updated_at";

/// Join clause matching the `p` / `c` aliases of [`JOINED_COLUMNS`].
const FROM_JOINED: &str = "FROM posters p JOIN categories c ON c.id = p.category_id";

/// PostgreSQL-backed [`PosterStore`].
#[derive(Debug, Clone)]
pub struct PosterRepo {
    pool: DbPool,
}

impl PosterRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PosterStore for PosterRepo {
    async fn create(&self, input: &NewPoster) -> Result<Poster, StoreError> {
        let query = format!(
            "WITH p AS ( \
                 INSERT INTO posters (id, category_id, image) \
                 VALUES ($1, $2, $3) \
                 RETURNING id, category_id, image, created_at, updated_at \
             ) \
             SELECT {JOINED_COLUMNS} FROM p JOIN categories c ON c.id = p.category_id"
        );
        let row = sqlx::query_as::<_, PosterRow>(&query)
            .bind(new_id())
            .bind(input.category_id)
            .bind(&input.image)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Poster>, StoreError> {
        let query = format!("SELECT {JOINED_COLUMNS} {FROM_JOINED} ORDER BY p.created_at, p.id");
        let rows = sqlx::query_as::<_, PosterRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Poster::from).collect())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Poster>, StoreError> {
        let query = format!("SELECT {JOINED_COLUMNS} {FROM_JOINED} WHERE p.id = $1");
        let row = sqlx::query_as::<_, PosterRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Poster::from))
    }

    async fn update(
        &self,
        id: DbId,
        changes: &PosterChanges,
    ) -> Result<Option<UpdatedPoster>, StoreError> {
        // `old` locks the row, so the image it reads is the one this
        // statement replaces even when another update committed first.
        let query = format!(
            "WITH old AS ( \
                 SELECT id, image FROM posters WHERE id = $1 FOR UPDATE \
             ), \
             p AS ( \
                 UPDATE posters SET \
                     category_id = $2, \
                     image = COALESCE($3, posters.image), \
                     updated_at = NOW() \
                 FROM old \
                 WHERE posters.id = old.id \
                 RETURNING posters.id, posters.category_id, posters.image, \
                     posters.created_at, posters.updated_at, \
                     old.image AS previous_image \
             ) \
             SELECT {JOINED_COLUMNS}, p.previous_image \
             FROM p JOIN categories c ON c.id = p.category_id"
        );
        let row = sqlx::query_as::<_, UpdatedPosterRow>(&query)
            .bind(id)
            .bind(changes.category_id)
            .bind(&changes.image)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UpdatedPoster::from))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_category_id(&self, category_id: DbId) -> Result<Vec<Poster>, StoreError> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} {FROM_JOINED} \
             WHERE p.category_id = $1 ORDER BY p.created_at, p.id"
        );
        let rows = sqlx::query_as::<_, PosterRow>(&query)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Poster::from).collect())
    }

    async fn list_by_category_name(&self, name: &str) -> Result<Vec<Poster>, StoreError> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} {FROM_JOINED} \
             WHERE c.name = $1 ORDER BY p.created_at, p.id"
        );
        let rows = sqlx::query_as::<_, PosterRow>(&query)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Poster::from).collect())
    }
}
