//! Poster operations and the image artifact lifecycle.
//!
//! Every mutation touches two resources, the poster row and its image file,
//! without a shared transaction. The rules that keep them consistent:
//!
//! - create: the image is written before the row. If the operation fails for
//!   any reason, the new image is removed.
//! - update: the row is updated first. On failure the new image is removed
//!   and the row and old image are untouched; on success the image the store
//!   reports as replaced is removed.
//! - delete: the row is deleted first, then the image best-effort. A crash in
//!   between leaves an orphaned file, never a row pointing at nothing.
//!
//! Mutations run on their own task. Dropping the request future (client
//! disconnect, request timeout) therefore cannot interrupt an operation
//! between the store write and its compensation.

use std::future::Future;
use std::sync::Arc;

use posterboard_core::artifact::{remove_if_present, ArtifactStore, PendingArtifact};
use posterboard_core::error::CoreError;
use posterboard_core::types::DbId;
use posterboard_core::validation::{parse_id_field, validate_input};
use posterboard_db::models::poster::{NewPoster, Poster, PosterChanges, PosterInput};
use posterboard_db::{PosterStore, StoreError};

use super::lookup_id;
use crate::error::{AppError, AppResult};
use crate::upload::{UploadedImage, CATEGORY_ID_FIELD};

const ENTITY: &str = "Poster";

#[derive(Clone)]
pub struct PosterService {
    store: Arc<dyn PosterStore>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl PosterService {
    pub fn new(store: Arc<dyn PosterStore>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { store, artifacts }
    }

    /// Create a poster for an image that the upload layer already stored.
    pub async fn create(
        &self,
        input: &PosterInput,
        image: Option<UploadedImage>,
    ) -> AppResult<Poster> {
        let service = self.clone();
        let input = input.clone();
        run_to_completion(async move {
            let pending = image.map(|img| service.pending(img));
            let result = service.insert(&input, pending.as_ref()).await;
            settle(pending, result).await
        })
        .await
    }

    async fn insert(
        &self,
        input: &PosterInput,
        pending: Option<&PendingArtifact>,
    ) -> AppResult<Poster> {
        let category_id = validated_category_id(input)?;
        let pending = pending
            .ok_or_else(|| CoreError::Validation("Image file is required".into()))?;

        let poster = self
            .store
            .create(&NewPoster {
                category_id,
                image: pending.reference().to_string(),
            })
            .await
            .map_err(unknown_category)?;

        tracing::info!(poster_id = %poster.id, category_id = %category_id, image = %poster.image, "Poster created");
        Ok(poster)
    }

    /// All posters. An empty collection is a 404.
    pub async fn list(&self) -> AppResult<Vec<Poster>> {
        non_empty(self.store.list().await?, "No posters found")
    }

    pub async fn get_by_id(&self, raw_id: &str) -> AppResult<Poster> {
        let id = lookup_id(ENTITY, raw_id)?;
        self.find(id, raw_id).await
    }

    /// Update a poster's category and, optionally, replace its image.
    pub async fn update(
        &self,
        raw_id: &str,
        input: &PosterInput,
        image: Option<UploadedImage>,
    ) -> AppResult<Poster> {
        let service = self.clone();
        let raw_id = raw_id.to_string();
        let input = input.clone();
        run_to_completion(async move {
            let pending = image.map(|img| service.pending(img));
            let result = service.apply_update(&raw_id, &input, pending.as_ref()).await;
            let (poster, replaced) = settle(pending, result).await?;

            if let Some(old_image) = replaced.filter(|old| *old != poster.image) {
                if remove_if_present(service.artifacts.as_ref(), &old_image).await {
                    tracing::info!(poster_id = %poster.id, path = %old_image, "Replaced poster image removed");
                }
            }
            Ok(poster)
        })
        .await
    }

    /// Returns the updated poster and, if the image was replaced, the old reference.
    async fn apply_update(
        &self,
        raw_id: &str,
        input: &PosterInput,
        pending: Option<&PendingArtifact>,
    ) -> AppResult<(Poster, Option<String>)> {
        let category_id = validated_category_id(input)?;
        let id = lookup_id(ENTITY, raw_id)?;

        let changes = PosterChanges {
            category_id,
            image: pending.map(|p| p.reference().to_string()),
        };
        let updated = self
            .store
            .update(id, &changes)
            .await
            .map_err(unknown_category)?
            .ok_or_else(|| CoreError::not_found(ENTITY, raw_id))?;

        tracing::info!(poster_id = %updated.poster.id, category_id = %category_id, "Poster updated");
        let replaced = changes.image.is_some().then_some(updated.previous_image);
        Ok((updated.poster, replaced))
    }

    /// Delete the row, then its image. A missing image is not an error.
    pub async fn delete(&self, raw_id: &str) -> AppResult<()> {
        let service = self.clone();
        let raw_id = raw_id.to_string();
        run_to_completion(async move { service.delete_row_then_image(&raw_id).await }).await
    }

    async fn delete_row_then_image(&self, raw_id: &str) -> AppResult<()> {
        let id = lookup_id(ENTITY, raw_id)?;
        let poster = self.find(id, raw_id).await?;

        if !self.store.delete(id).await? {
            return Err(CoreError::not_found(ENTITY, raw_id).into());
        }
        tracing::info!(poster_id = %id, "Poster deleted");

        if !remove_if_present(self.artifacts.as_ref(), &poster.image).await {
            tracing::debug!(poster_id = %id, path = %poster.image, "Poster image already absent");
        }
        Ok(())
    }

    /// Posters of one category. Unknown or malformed ids are a 404.
    pub async fn list_by_category_id(&self, raw_category_id: &str) -> AppResult<Vec<Poster>> {
        let posters = match raw_category_id.trim().parse::<DbId>() {
            Ok(category_id) => self.store.list_by_category_id(category_id).await?,
            Err(_) => Vec::new(),
        };
        non_empty(posters, "No posters found for this category")
    }

    pub async fn list_by_category_name(&self, name: &str) -> AppResult<Vec<Poster>> {
        non_empty(
            self.store.list_by_category_name(name).await?,
            "No posters found for this category",
        )
    }

    async fn find(&self, id: DbId, raw_id: &str) -> AppResult<Poster> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found(ENTITY, raw_id).into())
    }

    fn pending(&self, image: UploadedImage) -> PendingArtifact {
        PendingArtifact::new(Arc::clone(&self.artifacts), image.stored_path)
    }
}

/// Drive `operation` to completion on its own task, independent of the caller.
///
/// A panic inside the operation is resumed on the caller. The task can only
/// be cancelled by runtime shutdown, which is reported as an internal error.
async fn run_to_completion<T, F>(operation: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(operation).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(CoreError::Internal(format!(
            "Poster operation did not complete: {err}"
        ))
        .into()),
    }
}

/// Keep the uploaded artifact if the operation succeeded, remove it otherwise.
async fn settle<T>(pending: Option<PendingArtifact>, result: AppResult<T>) -> AppResult<T> {
    if let Some(pending) = pending {
        match &result {
            Ok(_) => {
                pending.keep();
            }
            Err(err) => {
                tracing::warn!(path = %pending.reference(), error = %err, "Poster operation failed, removing uploaded image");
                pending.discard().await;
            }
        }
    }
    result
}

fn validated_category_id(input: &PosterInput) -> Result<DbId, CoreError> {
    validate_input(input)?;
    parse_id_field(
        CATEGORY_ID_FIELD,
        input.category_id.as_deref().unwrap_or_default(),
    )
}

/// A poster write rejected by the category foreign key names a missing category.
fn unknown_category(err: StoreError) -> AppError {
    match err {
        StoreError::ForeignKeyViolation { .. } => AppError::Core(CoreError::Validation(
            "\"categoryId\" does not reference an existing category".into(),
        )),
        other => other.into(),
    }
}

fn non_empty(posters: Vec<Poster>, message: &str) -> AppResult<Vec<Poster>> {
    if posters.is_empty() {
        return Err(CoreError::NoRecords(message.into()).into());
    }
    Ok(posters)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use posterboard_core::artifact::LocalArtifactStore;
    use posterboard_db::models::category::Category;
    use posterboard_db::{CategoryStore, MemoryStore};

    use std::time::Duration;

    use posterboard_db::models::poster::UpdatedPoster;
    use tokio::sync::Notify;

    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<MemoryStore>,
        artifacts: Arc<LocalArtifactStore>,
        service: PosterService,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let artifacts = Arc::new(LocalArtifactStore::new(dir.path().join("uploads")));
        let service = PosterService::new(store.clone(), artifacts.clone());
        Fixture {
            _dir: dir,
            store,
            artifacts,
            service,
        }
    }

    impl Fixture {
        async fn category(&self, name: &str) -> Category {
            CategoryStore::create(self.store.as_ref(), name).await.unwrap()
        }

        async fn upload(&self) -> UploadedImage {
            let stored_path = self.artifacts.save("png", PNG).await.unwrap();
            UploadedImage {
                field_name: "image".into(),
                stored_path,
                size: PNG.len(),
                mime_type: "image/png".into(),
            }
        }

        fn exists(&self, path: &str) -> bool {
            std::path::Path::new(path).exists()
        }

        fn artifact_count(&self) -> usize {
            std::fs::read_dir(self.artifacts.root())
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn input(category_id: impl ToString) -> PosterInput {
        PosterInput {
            category_id: Some(category_id.to_string()),
        }
    }

    #[tokio::test]
    async fn create_keeps_image_and_includes_category() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let upload = fx.upload().await;

        let poster = fx
            .service
            .create(&input(category.id), Some(upload.clone()))
            .await
            .unwrap();

        assert_eq!(poster.image, upload.stored_path);
        assert_eq!(poster.category, category);
        assert!(fx.exists(&upload.stored_path));
    }

    #[tokio::test]
    async fn create_without_image_is_rejected() {
        let fx = fixture();
        let category = fx.category("Movies").await;

        let err = fx.service.create(&input(category.id), None).await.unwrap_err();
        assert_matches!(
            err,
            AppError::Core(CoreError::Validation(msg)) if msg == "Image file is required"
        );
        assert_eq!(fx.artifact_count(), 0);
    }

    #[tokio::test]
    async fn create_with_invalid_category_id_removes_upload() {
        let fx = fixture();
        let upload = fx.upload().await;

        let err = fx
            .service
            .create(&PosterInput::default(), Some(upload.clone()))
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Core(CoreError::Validation(_)));
        assert!(!fx.exists(&upload.stored_path));
    }

    #[tokio::test]
    async fn create_failing_persistence_removes_upload() {
        let fx = fixture();
        let upload = fx.upload().await;

        let err = fx
            .service
            .create(&input(posterboard_core::types::new_id()), Some(upload.clone()))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            AppError::Core(CoreError::Validation(msg)) if msg.contains("existing category")
        );
        assert!(!fx.exists(&upload.stored_path));
        assert!(PosterStore::list(fx.store.as_ref()).await.unwrap().is_empty());
    }

    /// A store whose database is unreachable.
    struct UnreachableStore;

    #[async_trait::async_trait]
    impl PosterStore for UnreachableStore {
        async fn create(&self, _: &NewPoster) -> Result<Poster, StoreError> {
            Err(unreachable_db())
        }
        async fn list(&self) -> Result<Vec<Poster>, StoreError> {
            Err(unreachable_db())
        }
        async fn find_by_id(&self, _: DbId) -> Result<Option<Poster>, StoreError> {
            Err(unreachable_db())
        }
        async fn update(
            &self,
            _: DbId,
            _: &PosterChanges,
        ) -> Result<Option<UpdatedPoster>, StoreError> {
            Err(unreachable_db())
        }
        async fn delete(&self, _: DbId) -> Result<bool, StoreError> {
            Err(unreachable_db())
        }
        async fn list_by_category_id(&self, _: DbId) -> Result<Vec<Poster>, StoreError> {
            Err(unreachable_db())
        }
        async fn list_by_category_name(&self, _: &str) -> Result<Vec<Poster>, StoreError> {
            Err(unreachable_db())
        }
    }

    fn unreachable_db() -> StoreError {
        StoreError::Database(sqlx::Error::PoolTimedOut)
    }

    /// Delegates to a [`MemoryStore`], yielding to the scheduler before every
    /// call. With a gate set, `update` also waits on it after committing.
    struct SteppedStore {
        inner: Arc<MemoryStore>,
        gate: Option<Arc<Notify>>,
    }

    impl SteppedStore {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self { inner, gate: None }
        }

        fn gated(inner: Arc<MemoryStore>, gate: Arc<Notify>) -> Self {
            Self {
                inner,
                gate: Some(gate),
            }
        }
    }

    #[async_trait::async_trait]
    impl PosterStore for SteppedStore {
        async fn create(&self, input: &NewPoster) -> Result<Poster, StoreError> {
            tokio::task::yield_now().await;
            PosterStore::create(self.inner.as_ref(), input).await
        }
        async fn list(&self) -> Result<Vec<Poster>, StoreError> {
            tokio::task::yield_now().await;
            PosterStore::list(self.inner.as_ref()).await
        }
        async fn find_by_id(&self, id: DbId) -> Result<Option<Poster>, StoreError> {
            tokio::task::yield_now().await;
            PosterStore::find_by_id(self.inner.as_ref(), id).await
        }
        async fn update(
            &self,
            id: DbId,
            changes: &PosterChanges,
        ) -> Result<Option<UpdatedPoster>, StoreError> {
            tokio::task::yield_now().await;
            let result = PosterStore::update(self.inner.as_ref(), id, changes).await;
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            result
        }
        async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
            tokio::task::yield_now().await;
            PosterStore::delete(self.inner.as_ref(), id).await
        }
        async fn list_by_category_id(&self, id: DbId) -> Result<Vec<Poster>, StoreError> {
            tokio::task::yield_now().await;
            self.inner.list_by_category_id(id).await
        }
        async fn list_by_category_name(&self, name: &str) -> Result<Vec<Poster>, StoreError> {
            tokio::task::yield_now().await;
            self.inner.list_by_category_name(name).await
        }
    }

    #[tokio::test]
    async fn concurrent_image_replacements_leave_one_file() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let first = fx.upload().await;
        let poster = fx
            .service
            .create(&input(category.id), Some(first.clone()))
            .await
            .unwrap();

        let service = PosterService::new(
            Arc::new(SteppedStore::new(fx.store.clone())),
            fx.artifacts.clone(),
        );
        let id = poster.id.to_string();
        let form = input(category.id);
        let (b, c) = (fx.upload().await, fx.upload().await);
        let (left, right) = tokio::join!(
            service.update(&id, &form, Some(b)),
            service.update(&id, &form, Some(c)),
        );
        left.unwrap();
        right.unwrap();

        let current = fx.service.get_by_id(&id).await.unwrap();
        assert_eq!(fx.artifact_count(), 1);
        assert!(fx.exists(&current.image));
        assert!(!fx.exists(&first.stored_path));
    }

    #[tokio::test]
    async fn update_interrupted_after_commit_still_settles() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let first = fx.upload().await;
        let poster = fx
            .service
            .create(&input(category.id), Some(first.clone()))
            .await
            .unwrap();

        let gate = Arc::new(Notify::new());
        let service = PosterService::new(
            Arc::new(SteppedStore::gated(fx.store.clone(), gate.clone())),
            fx.artifacts.clone(),
        );
        let second = fx.upload().await;

        // The caller gives up while the committed update has not returned yet.
        let id = poster.id.to_string();
        let form = input(category.id);
        let call = service.update(&id, &form, Some(second.clone()));
        assert!(tokio::time::timeout(Duration::from_millis(50), call)
            .await
            .is_err());
        gate.notify_one();

        for _ in 0..100 {
            if !fx.exists(&first.stored_path) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let current = fx.service.get_by_id(&poster.id.to_string()).await.unwrap();
        assert_eq!(current.image, second.stored_path);
        assert!(fx.exists(&second.stored_path));
        assert!(!fx.exists(&first.stored_path));
    }

    #[tokio::test]
    async fn create_with_unreachable_store_removes_upload() {
        let fx = fixture();
        let service = PosterService::new(Arc::new(UnreachableStore), fx.artifacts.clone());
        let upload = fx.upload().await;

        let err = service
            .create(&input(posterboard_core::types::new_id()), Some(upload.clone()))
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Store(StoreError::Database(_)));
        assert!(!fx.exists(&upload.stored_path));
    }

    #[tokio::test]
    async fn update_with_unreachable_store_removes_upload() {
        let fx = fixture();
        let service = PosterService::new(Arc::new(UnreachableStore), fx.artifacts.clone());
        let upload = fx.upload().await;

        let err = service
            .update(
                &posterboard_core::types::new_id().to_string(),
                &input(posterboard_core::types::new_id()),
                Some(upload.clone()),
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Store(_));
        assert!(!fx.exists(&upload.stored_path));
    }

    #[tokio::test]
    async fn update_with_new_image_replaces_old() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let first = fx.upload().await;
        let poster = fx
            .service
            .create(&input(category.id), Some(first.clone()))
            .await
            .unwrap();

        let second = fx.upload().await;
        let updated = fx
            .service
            .update(&poster.id.to_string(), &input(category.id), Some(second.clone()))
            .await
            .unwrap();

        assert_eq!(updated.image, second.stored_path);
        assert!(!fx.exists(&first.stored_path));
        assert!(fx.exists(&second.stored_path));
        assert_eq!(fx.artifact_count(), 1);
    }

    #[tokio::test]
    async fn update_without_image_keeps_existing() {
        let fx = fixture();
        let movies = fx.category("Movies").await;
        let music = fx.category("Music").await;
        let upload = fx.upload().await;
        let poster = fx
            .service
            .create(&input(movies.id), Some(upload.clone()))
            .await
            .unwrap();

        let updated = fx
            .service
            .update(&poster.id.to_string(), &input(music.id), None)
            .await
            .unwrap();

        assert_eq!(updated.category.name, "Music");
        assert_eq!(updated.image, upload.stored_path);
        assert!(fx.exists(&upload.stored_path));
    }

    #[tokio::test]
    async fn failed_update_removes_new_image_and_keeps_prior_state() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let first = fx.upload().await;
        let poster = fx
            .service
            .create(&input(category.id), Some(first.clone()))
            .await
            .unwrap();

        let second = fx.upload().await;
        let err = fx
            .service
            .update(
                &poster.id.to_string(),
                &input(posterboard_core::types::new_id()),
                Some(second.clone()),
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Core(CoreError::Validation(_)));

        assert!(!fx.exists(&second.stored_path));
        assert!(fx.exists(&first.stored_path));
        let unchanged = fx.service.get_by_id(&poster.id.to_string()).await.unwrap();
        assert_eq!(unchanged, poster);
    }

    #[tokio::test]
    async fn update_of_missing_poster_removes_new_image() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let upload = fx.upload().await;

        let err = fx
            .service
            .update(
                &posterboard_core::types::new_id().to_string(),
                &input(category.id),
                Some(upload.clone()),
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Core(CoreError::NotFound { entity: "Poster", .. }));
        assert!(!fx.exists(&upload.stored_path));
    }

    #[tokio::test]
    async fn delete_removes_row_and_image() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let upload = fx.upload().await;
        let poster = fx
            .service
            .create(&input(category.id), Some(upload.clone()))
            .await
            .unwrap();

        fx.service.delete(&poster.id.to_string()).await.unwrap();

        assert!(!fx.exists(&upload.stored_path));
        assert_matches!(
            fx.service.get_by_id(&poster.id.to_string()).await,
            Err(AppError::Core(CoreError::NotFound { .. }))
        );
    }

    #[tokio::test]
    async fn delete_succeeds_when_image_already_gone() {
        let fx = fixture();
        let category = fx.category("Movies").await;
        let upload = fx.upload().await;
        let poster = fx
            .service
            .create(&input(category.id), Some(upload.clone()))
            .await
            .unwrap();
        std::fs::remove_file(&upload.stored_path).unwrap();

        fx.service.delete(&poster.id.to_string()).await.unwrap();
        assert!(PosterStore::list(fx.store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listings_report_empty_as_not_found() {
        let fx = fixture();
        let category = fx.category("Movies").await;

        assert_matches!(
            fx.service.list().await,
            Err(AppError::Core(CoreError::NoRecords(_)))
        );
        assert_matches!(
            fx.service.list_by_category_id(&category.id.to_string()).await,
            Err(AppError::Core(CoreError::NoRecords(_)))
        );
        assert_matches!(
            fx.service.list_by_category_id("not-an-id").await,
            Err(AppError::Core(CoreError::NoRecords(_)))
        );
        assert_matches!(
            fx.service.list_by_category_name("Movies").await,
            Err(AppError::Core(CoreError::NoRecords(_)))
        );
    }
}
