use async_trait::async_trait;
use sqlx::Row;

use casenote_core::domain::thread::{Message, Thread, ThreadId};

use super::{RepositoryError, ThreadRepository};
use crate::DbPool;

pub struct SqlThreadRepository {
    pool: DbPool,
}

impl SqlThreadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_thread(row: &sqlx::sqlite::SqliteRow) -> Result<Thread, RepositoryError> {
    let messages_raw: String = row.get("messages");
    let messages: Vec<Message> = serde_json::from_str(&messages_raw)
        .map_err(|error| RepositoryError::Decode(format!("thread messages column: {error}")))?;

    Ok(Thread {
        thread_id: ThreadId(row.get("thread_id")),
        subject: row.get("subject"),
        topic: row.get("topic"),
        initiated_by: row.get("initiated_by"),
        order_id: row.get("order_id"),
        product: row.get("product"),
        messages,
    })
}

#[async_trait]
impl ThreadRepository for SqlThreadRepository {
    async fn list(&self) -> Result<Vec<Thread>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT thread_id, subject, topic, initiated_by, order_id, product, messages \
             FROM thread ORDER BY thread_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_thread).collect()
    }

    async fn find_by_id(&self, id: &ThreadId) -> Result<Option<Thread>, RepositoryError> {
        let row = sqlx::query(
            "SELECT thread_id, subject, topic, initiated_by, order_id, product, messages \
             FROM thread WHERE thread_id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_thread).transpose()
    }

    async fn upsert(&self, thread: Thread) -> Result<bool, RepositoryError> {
        let messages = serde_json::to_string(&thread.messages)
            .map_err(|error| RepositoryError::Decode(format!("thread messages: {error}")))?;

        let existed: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM thread WHERE thread_id = ?1")
                .bind(&thread.thread_id.0)
                .fetch_optional(&self.pool)
                .await?;

        sqlx::query(
            "INSERT INTO thread (thread_id, subject, topic, initiated_by, order_id, product, messages) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(thread_id) DO UPDATE SET \
               subject = excluded.subject, \
               topic = excluded.topic, \
               initiated_by = excluded.initiated_by, \
               order_id = excluded.order_id, \
               product = excluded.product, \
               messages = excluded.messages",
        )
        .bind(&thread.thread_id.0)
        .bind(&thread.subject)
        .bind(&thread.topic)
        .bind(&thread.initiated_by)
        .bind(&thread.order_id)
        .bind(&thread.product)
        .bind(&messages)
        .execute(&self.pool)
        .await?;

        Ok(existed.is_none())
    }
}
