use std::sync::Arc;

use posterboard_core::error::CoreError;
use posterboard_core::validation::validate_input;
use posterboard_db::models::category::{Category, CategoryInput};
use posterboard_db::{CategoryStore, StoreError};

use super::lookup_id;
use crate::error::{AppError, AppResult};

const ENTITY: &str = "Category";

/// Category CRUD. Each operation is a single store call.
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: &CategoryInput) -> AppResult<Category> {
        let name = validated_name(input)?;
        let category = self.store.create(name).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// All categories. An empty collection is a 404, not an empty list.
    pub async fn list(&self) -> AppResult<Vec<Category>> {
        let categories = self.store.list().await?;
        if categories.is_empty() {
            return Err(CoreError::NoRecords("No categories found".into()).into());
        }
        Ok(categories)
    }

    pub async fn get_by_id(&self, raw_id: &str) -> AppResult<Category> {
        let id = lookup_id(ENTITY, raw_id)?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found(ENTITY, raw_id).into())
    }

    /// Input is validated before the id is looked up, so a bad body is a 400
    /// even for an unknown id.
    pub async fn update(&self, raw_id: &str, input: &CategoryInput) -> AppResult<Category> {
        let name = validated_name(input)?;
        let id = lookup_id(ENTITY, raw_id)?;
        let category = self
            .store
            .update(id, name)
            .await?
            .ok_or_else(|| CoreError::not_found(ENTITY, raw_id))?;
        tracing::info!(category_id = %category.id, name = %category.name, "Category updated");
        Ok(category)
    }

    /// Categories still referenced by posters are not deleted (409).
    pub async fn delete(&self, raw_id: &str) -> AppResult<()> {
        let id = lookup_id(ENTITY, raw_id)?;
        let deleted = self.store.delete(id).await.map_err(|err| match err {
            StoreError::ForeignKeyViolation { .. } => AppError::Core(CoreError::Conflict(
                "Category is still referenced by posters".into(),
            )),
            other => other.into(),
        })?;
        if !deleted {
            return Err(CoreError::not_found(ENTITY, raw_id).into());
        }
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Reachability of the underlying store.
    pub async fn ping(&self) -> AppResult<()> {
        Ok(self.store.ping().await?)
    }
}

fn validated_name(input: &CategoryInput) -> Result<&str, CoreError> {
    validate_input(input)?;
    Ok(input.name.as_deref().unwrap_or_default())
}
