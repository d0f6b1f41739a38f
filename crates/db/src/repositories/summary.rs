use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use casenote_core::domain::summary::{GenerationMethod, Summary, SummaryState};
use casenote_core::domain::thread::ThreadId;

use super::{RepositoryError, SummaryRepository};
use crate::DbPool;

pub struct SqlSummaryRepository {
    pool: DbPool,
}

impl SqlSummaryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("summary {column} column: {error}")))
}

fn decode_json(raw: &str, column: &str) -> Result<serde_json::Value, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("summary {column} column: {error}")))
}

fn decode_summary(row: &sqlx::sqlite::SqliteRow) -> Result<Summary, RepositoryError> {
    let method_raw: String = row.get("method");
    let method = GenerationMethod::parse(&method_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("summary method column: unknown value `{method_raw}`"))
    })?;

    let state_raw: String = row.get("state");
    let state = SummaryState::parse(&state_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("summary state column: unknown value `{state_raw}`"))
    })?;

    let draft_fields_raw: String = row.get("draft_fields");
    let edited_fields_raw: String = row.get("edited_fields");
    let approved_fields_raw: String = row.get("approved_fields");

    let approved_at: Option<String> = row.get("approved_at");
    let created_at_raw: String = row.get("created_at");
    let updated_at_raw: String = row.get("updated_at");

    Ok(Summary {
        thread_id: ThreadId(row.get("thread_id")),
        method,
        draft_summary: row.get("draft_summary"),
        draft_fields: decode_json(&draft_fields_raw, "draft_fields")?,
        edited_summary: row.get("edited_summary"),
        edited_fields: decode_json(&edited_fields_raw, "edited_fields")?,
        approved_summary: row.get("approved_summary"),
        approved_fields: decode_json(&approved_fields_raw, "approved_fields")?,
        state,
        approver: row.get("approver"),
        approved_at: approved_at
            .as_deref()
            .map(|raw| decode_timestamp(raw, "approved_at"))
            .transpose()?,
        created_at: decode_timestamp(&created_at_raw, "created_at")?,
        updated_at: decode_timestamp(&updated_at_raw, "updated_at")?,
    })
}

#[async_trait]
impl SummaryRepository for SqlSummaryRepository {
    async fn find_by_thread(&self, id: &ThreadId) -> Result<Option<Summary>, RepositoryError> {
        let row = sqlx::query(
            "SELECT thread_id, method, draft_summary, draft_fields, edited_summary, \
                    edited_fields, approved_summary, approved_fields, state, approver, \
                    approved_at, created_at, updated_at \
             FROM summary WHERE thread_id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_summary).transpose()
    }

    async fn save(&self, summary: Summary) -> Result<(), RepositoryError> {
        let draft_fields = serde_json::to_string(&summary.draft_fields)
            .map_err(|error| RepositoryError::Decode(format!("draft_fields: {error}")))?;
        let edited_fields = serde_json::to_string(&summary.edited_fields)
            .map_err(|error| RepositoryError::Decode(format!("edited_fields: {error}")))?;
        let approved_fields = serde_json::to_string(&summary.approved_fields)
            .map_err(|error| RepositoryError::Decode(format!("approved_fields: {error}")))?;

        sqlx::query(
            "INSERT INTO summary (thread_id, method, draft_summary, draft_fields, \
                                  edited_summary, edited_fields, approved_summary, \
                                  approved_fields, state, approver, approved_at, \
                                  created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             ON CONFLICT(thread_id) DO UPDATE SET \
               method = excluded.method, \
               draft_summary = excluded.draft_summary, \
               draft_fields = excluded.draft_fields, \
               edited_summary = excluded.edited_summary, \
               edited_fields = excluded.edited_fields, \
               approved_summary = excluded.approved_summary, \
               approved_fields = excluded.approved_fields, \
               state = excluded.state, \
               approver = excluded.approver, \
               approved_at = excluded.approved_at, \
               updated_at = excluded.updated_at",
        )
        .bind(&summary.thread_id.0)
        .bind(summary.method.as_str())
        .bind(&summary.draft_summary)
        .bind(&draft_fields)
        .bind(&summary.edited_summary)
        .bind(&edited_fields)
        .bind(&summary.approved_summary)
        .bind(&approved_fields)
        .bind(summary.state.as_str())
        .bind(&summary.approver)
        .bind(summary.approved_at.map(|at| at.to_rfc3339()))
        .bind(summary.created_at.to_rfc3339())
        .bind(summary.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_thread(&self, id: &ThreadId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM summary WHERE thread_id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM summary").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
