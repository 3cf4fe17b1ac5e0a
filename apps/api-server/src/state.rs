//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{CommentRepository, PostRepository, TokenBlacklist, UserRepository};
use quill_infra::database::{
    DatabaseConfig, PostgresCommentRepository, PostgresPostRepository, PostgresTokenBlacklist,
    PostgresUserRepository, connect,
};
use quill_infra::memory::InMemoryStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    ///
    /// Also returns the token blacklist so the caller can construct the
    /// token service against the same backing store.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> (Self, Arc<dyn TokenBlacklist>) {
        match db_config {
            Some(config) => match connect(config).await {
                Ok(db) => {
                    let state = Self {
                        users: Arc::new(PostgresUserRepository::new(db.clone())),
                        posts: Arc::new(PostgresPostRepository::new(db.clone())),
                        comments: Arc::new(PostgresCommentRepository::new(db.clone())),
                    };
                    tracing::info!("Application state initialized (postgres)");
                    (state, Arc::new(PostgresTokenBlacklist::new(db)))
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    Self::in_memory()
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                Self::in_memory()
            }
        }
    }

    /// In-memory state for database-less operation and tests.
    pub fn in_memory() -> (Self, Arc<dyn TokenBlacklist>) {
        let store = Arc::new(InMemoryStore::new());
        let state = Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
        };
        (state, store)
    }
}
