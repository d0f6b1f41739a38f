//! In-memory repository fakes for handler and workflow tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use casenote_core::domain::summary::Summary;
use casenote_core::domain::thread::{Thread, ThreadId};

use super::{RepositoryError, SummaryRepository, ThreadRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Clone, Default)]
pub struct InMemoryThreadRepository {
    threads: Arc<Mutex<BTreeMap<String, Thread>>>,
}

impl InMemoryThreadRepository {
    pub fn with_threads(threads: Vec<Thread>) -> Self {
        let repo = Self::default();
        {
            let mut map = lock(&repo.threads);
            for thread in threads {
                map.insert(thread.thread_id.0.clone(), thread);
            }
        }
        repo
    }
}

#[async_trait]
impl ThreadRepository for InMemoryThreadRepository {
    async fn list(&self) -> Result<Vec<Thread>, RepositoryError> {
        Ok(lock(&self.threads).values().cloned().collect())
    }

    async fn find_by_id(&self, id: &ThreadId) -> Result<Option<Thread>, RepositoryError> {
        Ok(lock(&self.threads).get(&id.0).cloned())
    }

    async fn upsert(&self, thread: Thread) -> Result<bool, RepositoryError> {
        Ok(lock(&self.threads).insert(thread.thread_id.0.clone(), thread).is_none())
    }
}

#[derive(Clone, Default)]
pub struct InMemorySummaryRepository {
    summaries: Arc<Mutex<BTreeMap<String, Summary>>>,
}

#[async_trait]
impl SummaryRepository for InMemorySummaryRepository {
    async fn find_by_thread(&self, id: &ThreadId) -> Result<Option<Summary>, RepositoryError> {
        Ok(lock(&self.summaries).get(&id.0).cloned())
    }

    async fn save(&self, summary: Summary) -> Result<(), RepositoryError> {
        lock(&self.summaries).insert(summary.thread_id.0.clone(), summary);
        Ok(())
    }

    async fn delete_by_thread(&self, id: &ThreadId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.summaries).remove(&id.0).is_some())
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let mut map = lock(&self.summaries);
        let removed = map.len() as u64;
        map.clear();
        Ok(removed)
    }
}
