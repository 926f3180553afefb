//! In-process implementation of [`CategoryStore`] and [`PosterStore`].
//!
//! Enforces the same constraints as the PostgreSQL schema (poster category
//! foreign key with RESTRICT on delete, unique poster image) so services
//! behave identically against either backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use posterboard_core::types::{new_id, DbId, Timestamp};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::category::Category;
use crate::models::poster::{NewPoster, Poster, PosterChanges, UpdatedPoster};
use crate::store::{CategoryStore, PosterStore};

const FK_POSTERS_CATEGORY: &str = "fk_posters_category_id";
const UQ_POSTERS_IMAGE: &str = "uq_posters_image";

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct Tables {
    categories: BTreeMap<DbId, Category>,
    posters: BTreeMap<DbId, PosterRecord>,
}

/// A poster row as stored, without the joined category.
#[derive(Debug, Clone)]
struct PosterRecord {
    id: DbId,
    category_id: DbId,
    image: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Tables {
    fn join(&self, record: &PosterRecord) -> Option<Poster> {
        let category = self.categories.get(&record.category_id)?;
        Some(Poster {
            id: record.id,
            category_id: record.category_id,
            image: record.image.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            category: category.clone(),
        })
    }

    fn posters_where(&self, keep: impl Fn(&PosterRecord) -> bool) -> Vec<Poster> {
        let mut records: Vec<_> = self.posters.values().filter(|r| keep(*r)).collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        records.into_iter().filter_map(|r| self.join(r)).collect()
    }

    fn require_category(&self, id: DbId) -> Result<(), StoreError> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation {
                constraint: FK_POSTERS_CATEGORY.into(),
            })
        }
    }

    fn require_unique_image(&self, image: &str, except: Option<DbId>) -> Result<(), StoreError> {
        let taken = self
            .posters
            .values()
            .any(|r| r.image == image && Some(r.id) != except);
        if taken {
            Err(StoreError::UniqueViolation {
                constraint: UQ_POSTERS_IMAGE.into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create(&self, name: &str) -> Result<Category, StoreError> {
        let now = Utc::now();
        let category = Category {
            id: new_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .categories
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<_> = tables.categories.values().cloned().collect();
        categories.sort_by_key(|c| (c.created_at, c.id));
        Ok(categories)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn update(&self, id: DbId, name: &str) -> Result<Option<Category>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.categories.get_mut(&id).map(|category| {
            category.name = name.to_string();
            category.updated_at = Utc::now();
            category.clone()
        }))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Ok(false);
        }
        if tables.posters.values().any(|r| r.category_id == id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: FK_POSTERS_CATEGORY.into(),
            });
        }
        tables.categories.remove(&id);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl PosterStore for MemoryStore {
    async fn create(&self, input: &NewPoster) -> Result<Poster, StoreError> {
        let mut tables = self.tables.write().await;
        tables.require_category(input.category_id)?;
        tables.require_unique_image(&input.image, None)?;

        let now = Utc::now();
        let record = PosterRecord {
            id: new_id(),
            category_id: input.category_id,
            image: input.image.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.posters.insert(record.id, record.clone());
        tables
            .join(&record)
            .ok_or_else(|| StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn list(&self) -> Result<Vec<Poster>, StoreError> {
        Ok(self.tables.read().await.posters_where(|_| true))
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Poster>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posters.get(&id).and_then(|r| tables.join(r)))
    }

    async fn update(
        &self,
        id: DbId,
        changes: &PosterChanges,
    ) -> Result<Option<UpdatedPoster>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.posters.contains_key(&id) {
            return Ok(None);
        }
        tables.require_category(changes.category_id)?;
        if let Some(image) = &changes.image {
            tables.require_unique_image(image, Some(id))?;
        }

        let Some(record) = tables.posters.get_mut(&id) else {
            return Ok(None);
        };
        let previous_image = record.image.clone();
        record.category_id = changes.category_id;
        if let Some(image) = &changes.image {
            record.image = image.clone();
        }
        record.updated_at = Utc::now();
        let record = record.clone();

        Ok(tables.join(&record).map(|poster| UpdatedPoster {
            poster,
            previous_image,
        }))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.posters.remove(&id).is_some())
    }

    async fn list_by_category_id(&self, category_id: DbId) -> Result<Vec<Poster>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .posters_where(|r| r.category_id == category_id))
    }

    async fn list_by_category_name(&self, name: &str) -> Result<Vec<Poster>, StoreError> {
        let tables = self.tables.read().await;
        let ids: Vec<DbId> = tables
            .categories
            .values()
            .filter(|c| c.name == name)
            .map(|c| c.id)
            .collect();
        Ok(tables.posters_where(|r| ids.contains(&r.category_id)))
    }
}
