//! Storage for uploaded binaries that live outside the database.
//!
//! An artifact is addressed by a stable string reference returned from
//! [`ArtifactStore::save`]. Database rows hold that reference; this module
//! owns the bytes.
//!
//! [`PendingArtifact`] scopes a freshly written artifact to the operation
//! that will reference it: the operation either [`keep`](PendingArtifact::keep)s
//! it once the row is committed or [`discard`](PendingArtifact::discard)s it
//! on failure. If neither happens (the future was dropped mid-flight), the
//! artifact is removed from `Drop`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Errors raised by an [`ArtifactStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Reference escapes the artifact root: {0}")]
    OutsideRoot(String),
}

/// Save, probe and delete binaries by reference.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `data` under a freshly generated unique name ending in
    /// `.{extension}` and return its reference.
    async fn save(&self, extension: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Whether an artifact currently exists for `reference`.
    async fn exists(&self, reference: &str) -> Result<bool, StorageError>;

    /// Delete the artifact. Returns `Ok(false)` if it was already absent.
    async fn delete(&self, reference: &str) -> Result<bool, StorageError>;
}

/// Filesystem-backed [`ArtifactStore`] rooted at the upload directory.
///
/// References are the relative (or absolute, if the root is absolute) path
/// of the file, e.g. `uploads/0192f1c4-....png`.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))
    }

    /// Map a reference back to a path, refusing anything outside the root.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let path = PathBuf::from(reference);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) || path == self.root {
            return Err(StorageError::OutsideRoot(reference.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn save(&self, extension: &str, data: &[u8]) -> Result<String, StorageError> {
        self.ensure_root().await?;

        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let final_path = self.root.join(&file_name);
        let temp_path = self.root.join(format!(".{file_name}.tmp"));

        // Write to a temp file first so a half-written image is never visible
        // under its final name.
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error(&final_path, e));
        }

        tracing::debug!(path = %final_path.display(), size = data.len(), "Artifact saved");
        Ok(final_path.to_string_lossy().into_owned())
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        fs::try_exists(&path).await.map_err(|e| io_error(&path, e))
    }

    async fn delete(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Artifact deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Delete an artifact if it is still present, logging instead of failing.
///
/// Returns `true` if a file was actually removed.
pub async fn remove_if_present(store: &dyn ArtifactStore, reference: &str) -> bool {
    match store.exists(reference).await {
        Ok(false) => return false,
        Ok(true) => {}
        Err(e) => {
            tracing::warn!(path = %reference, error = %e, "Could not probe artifact");
            return false;
        }
    }

    match store.delete(reference).await {
        Ok(removed) => removed,
        Err(e) => {
            tracing::warn!(path = %reference, error = %e, "Failed to delete artifact");
            false
        }
    }
}

/// A freshly written artifact whose owning row has not been committed yet.
pub struct PendingArtifact {
    store: Arc<dyn ArtifactStore>,
    reference: Option<String>,
}

impl PendingArtifact {
    pub fn new(store: Arc<dyn ArtifactStore>, reference: impl Into<String>) -> Self {
        Self {
            store,
            reference: Some(reference.into()),
        }
    }

    pub fn reference(&self) -> &str {
        self.reference.as_deref().unwrap_or_default()
    }

    /// The owning row is committed; the artifact stays.
    pub fn keep(mut self) -> String {
        self.reference.take().unwrap_or_default()
    }

    /// The operation failed; remove the artifact now.
    pub async fn discard(mut self) {
        if let Some(reference) = self.reference.take() {
            tracing::warn!(path = %reference, "Discarding uploaded artifact after failed operation");
            remove_if_present(self.store.as_ref(), &reference).await;
        }
    }
}

impl Drop for PendingArtifact {
    fn drop(&mut self) {
        let Some(reference) = self.reference.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(path = %reference, "Pending artifact dropped, scheduling removal");
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    remove_if_present(store.as_ref(), &reference).await;
                });
            }
            Err(_) => {
                tracing::error!(path = %reference, "Pending artifact dropped outside a runtime, left on disk");
            }
        }
    }
}
