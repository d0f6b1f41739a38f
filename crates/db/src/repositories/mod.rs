use async_trait::async_trait;
use thiserror::Error;

use casenote_core::domain::summary::Summary;
use casenote_core::domain::thread::{Thread, ThreadId};

pub mod memory;
pub mod summary;
pub mod thread;

pub use memory::{InMemorySummaryRepository, InMemoryThreadRepository};
pub use summary::SqlSummaryRepository;
pub use thread::SqlThreadRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Thread>, RepositoryError>;
    async fn find_by_id(&self, id: &ThreadId) -> Result<Option<Thread>, RepositoryError>;
    /// Insert-or-replace by thread id; ingest re-runs must converge.
    async fn upsert(&self, thread: Thread) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait SummaryRepository: Send + Sync {
    async fn find_by_thread(&self, id: &ThreadId) -> Result<Option<Summary>, RepositoryError>;
    async fn save(&self, summary: Summary) -> Result<(), RepositoryError>;
    async fn delete_by_thread(&self, id: &ThreadId) -> Result<bool, RepositoryError>;
    async fn delete_all(&self) -> Result<u64, RepositoryError>;
}
