use std::sync::Arc;

use posterboard_core::artifact::ArtifactStore;
use posterboard_db::{CategoryStore, PosterStore};

use crate::config::ServerConfig;
use crate::services::{CategoryService, PosterService};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Built once at startup from explicitly constructed store clients; cheap to
/// clone since everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (accessed by extractors and handlers).
    pub config: Arc<ServerConfig>,
    /// Artifact storage for uploaded images.
    pub artifacts: Arc<dyn ArtifactStore>,
    pub categories: Arc<CategoryService>,
    pub posters: Arc<PosterService>,
}

impl AppState {
    /// Wire services to the given store clients.
    pub fn new(
        config: ServerConfig,
        category_store: Arc<dyn CategoryStore>,
        poster_store: Arc<dyn PosterStore>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            categories: Arc::new(CategoryService::new(category_store)),
            posters: Arc::new(PosterService::new(poster_store, Arc::clone(&artifacts))),
            artifacts,
        }
    }
}
