//! Persistence interface for categories and posters.
//!
//! Services hold these as `Arc<dyn ...>` so the backing store is chosen once
//! at startup. Lookups return `Ok(None)` / `Ok(false)` for missing rows;
//! errors are reserved for constraint violations and driver failures.

use async_trait::async_trait;
use posterboard_core::types::DbId;

use crate::error::StoreError;
use crate::models::category::Category;
use crate::models::poster::{NewPoster, Poster, PosterChanges, UpdatedPoster};

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, name: &str) -> Result<Category, StoreError>;

    /// All categories, oldest first.
    async fn list(&self) -> Result<Vec<Category>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Category>, StoreError>;

    /// Rename a category. Returns `None` if it does not exist.
    async fn update(&self, id: DbId, name: &str) -> Result<Option<Category>, StoreError>;

    /// Delete a category. Returns `false` if it did not exist. Fails with
    /// [`StoreError::ForeignKeyViolation`] while posters still reference it.
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;

    /// Confirm the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Every poster returned by this trait carries its category.
#[async_trait]
pub trait PosterStore: Send + Sync {
    /// Fails with [`StoreError::ForeignKeyViolation`] if the category does not exist.
    async fn create(&self, input: &NewPoster) -> Result<Poster, StoreError>;

    /// All posters, oldest first.
    async fn list(&self) -> Result<Vec<Poster>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Poster>, StoreError>;

    /// Returns `None` if the poster does not exist. The previous image is read
    /// in the same atomic write, so concurrent updates each see the image
    /// they actually replaced.
    async fn update(
        &self,
        id: DbId,
        changes: &PosterChanges,
    ) -> Result<Option<UpdatedPoster>, StoreError>;

    /// Returns `false` if the poster did not exist.
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;

    async fn list_by_category_id(&self, category_id: DbId) -> Result<Vec<Poster>, StoreError>;

    async fn list_by_category_name(&self, name: &str) -> Result<Vec<Poster>, StoreError>;
}
