use std::net::SocketAddr;
use std::sync::Arc;

use posterboard_core::artifact::{ArtifactStore, LocalArtifactStore};
use posterboard_db::repositories::{CategoryRepo, PosterRepo};
use posterboard_db::{CategoryStore, DbPool, MemoryStore, PosterStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posterboard_api::config::{ServerConfig, StoreBackend};
use posterboard_api::router::build_app_router;
use posterboard_api::state::AppState;

/// Store clients selected at startup.
struct Stores {
    categories: Arc<dyn CategoryStore>,
    posters: Arc<dyn PosterStore>,
    /// Held so the pool can be closed on shutdown.
    pool: Option<DbPool>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "posterboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        upload_dir = %config.upload_dir.display(),
        store = ?config.store,
        "Loaded server configuration",
    );

    // --- Persistence ---
    let stores = connect_stores(config.store).await;

    // --- Artifact storage ---
    let local = LocalArtifactStore::new(config.upload_dir.clone());
    local
        .ensure_root()
        .await
        .expect("Failed to create upload directory");
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(local);
    tracing::info!("Artifact store ready");

    // --- App state + router ---
    let state = AppState::new(
        config.clone(),
        stores.categories,
        stores.posters,
        artifacts,
    );
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(pool) = stores.pool {
        pool.close().await;
        tracing::info!("Database pool closed");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Build the store clients for the configured backend.
///
/// Panics if the database is unreachable or migrations fail.
async fn connect_stores(backend: StoreBackend) -> Stores {
    match backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Stores {
                categories: store.clone(),
                posters: store,
                pool: None,
            }
        }
        StoreBackend::Postgres => {
            let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

            let pool = posterboard_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            posterboard_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            posterboard_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Stores {
                categories: Arc::new(CategoryRepo::new(pool.clone())),
                posters: Arc::new(PosterRepo::new(pool.clone())),
                pool: Some(pool),
            }
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
