//! JSON API for the summary workflow.
//!
//! Endpoints:
//! - `GET  /api/threads/`                    — list ingested threads
//! - `GET  /api/threads/{id}/`               — thread detail with messages
//! - `POST /api/summarize`                   — generate/refresh a draft summary
//! - `GET  /api/summary/{id}`                — current summary for a thread
//! - `POST /api/summary/{id}/save-edit`      — record a human edit
//! - `POST /api/summary/{id}/approve`        — approve and export
//! - `POST /api/crm/post-note`               — append a simulated CRM note
//! - `POST /api/admin/reset`                 — delete one or all summaries
//! - `POST /api/admin/ingest`                — load the bundled sample threads

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use casenote_agent::DraftGenerator;
use casenote_core::crm::CrmDirectory;
use casenote_core::domain::summary::{Summary, SummaryState};
use casenote_core::domain::thread::{Thread, ThreadId};
use casenote_core::errors::{ApplicationError, InterfaceError};
use casenote_core::export::{ApprovedSummaryRecord, CrmNoteRecord, ExportSink};
use casenote_db::fixtures;
use casenote_db::repositories::{RepositoryError, SummaryRepository, ThreadRepository};

#[derive(Clone)]
pub struct ApiState {
    threads: Arc<dyn ThreadRepository>,
    summaries: Arc<dyn SummaryRepository>,
    crm: Arc<CrmDirectory>,
    generator: Arc<DraftGenerator>,
    approved_log: Arc<dyn ExportSink>,
    crm_notes_log: Arc<dyn ExportSink>,
    /// Config-level default credential, used when a request carries none.
    default_llm_token: Option<String>,
}

impl ApiState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        summaries: Arc<dyn SummaryRepository>,
        crm: Arc<CrmDirectory>,
        generator: Arc<DraftGenerator>,
        approved_log: Arc<dyn ExportSink>,
        crm_notes_log: Arc<dyn ExportSink>,
        default_llm_token: Option<String>,
    ) -> Self {
        Self { threads, summaries, crm, generator, approved_log, crm_notes_log, default_llm_token }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/threads/", get(list_threads))
        .route("/api/threads/{thread_id}/", get(get_thread))
        .route("/api/summarize", post(summarize))
        .route("/api/summary/{thread_id}", get(get_summary))
        .route("/api/summary/{thread_id}/save-edit", post(save_edit))
        .route("/api/summary/{thread_id}/approve", post(approve))
        .route("/api/crm/post-note", post(post_crm_note))
        .route("/api/admin/reset", post(admin_reset))
        .route("/api/admin/ingest", post(admin_ingest))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub thread_id: Option<String>,
    pub llm_token: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveEditRequest {
    pub edited_summary: Option<String>,
    pub edited_fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approver: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrmNoteRequest {
    pub thread_id: Option<String>,
    pub note: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ThreadListItem {
    pub thread_id: String,
    pub subject: String,
    pub topic: String,
    pub initiated_by: String,
    pub order_id: String,
    pub product: String,
}

impl From<&Thread> for ThreadListItem {
    fn from(thread: &Thread) -> Self {
        Self {
            thread_id: thread.thread_id.0.clone(),
            subject: thread.subject.clone(),
            topic: thread.topic.clone(),
            initiated_by: thread.initiated_by.clone(),
            order_id: thread.order_id.clone(),
            product: thread.product.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub thread: ThreadListItem,
    pub method: &'static str,
    pub draft_summary: String,
    pub draft_fields: Value,
    pub edited_summary: String,
    pub edited_fields: Value,
    pub approved_summary: String,
    pub approved_fields: Value,
    pub state: &'static str,
    pub approver: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryResponse {
    fn new(thread: &Thread, summary: Summary) -> Self {
        Self {
            thread: ThreadListItem::from(thread),
            method: summary.method.as_str(),
            draft_summary: summary.draft_summary,
            draft_fields: summary.draft_fields,
            edited_summary: summary.edited_summary,
            edited_fields: summary.edited_fields,
            approved_summary: summary.approved_summary,
            approved_fields: summary.approved_fields,
            state: summary.state.as_str(),
            approver: summary.approver,
            approved_at: summary.approved_at,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    correlation_id: String,
}

pub struct ApiError(InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        warn!(
            event_name = "api.request.failed",
            correlation_id = %correlation_id,
            error = %error,
            "request failed"
        );
        Self(error.into_interface(correlation_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn export(error: casenote_core::export::ExportError) -> ApplicationError {
    ApplicationError::Integration(error.to_string())
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

async fn load_thread(
    state: &ApiState,
    thread_id: &str,
    correlation_id: &str,
) -> Result<Thread, ApiError> {
    state
        .threads
        .find_by_id(&ThreadId(thread_id.to_string()))
        .await
        .map_err(persistence)
        .and_then(|found| {
            found.ok_or_else(|| ApplicationError::not_found("thread", thread_id))
        })
        .map_err(|error| ApiError::from_application(error, correlation_id))
}

async fn load_summary(
    state: &ApiState,
    thread_id: &str,
    correlation_id: &str,
) -> Result<Summary, ApiError> {
    state
        .summaries
        .find_by_thread(&ThreadId(thread_id.to_string()))
        .await
        .map_err(persistence)
        .and_then(|found| {
            found.ok_or_else(|| ApplicationError::not_found("summary", thread_id))
        })
        .map_err(|error| ApiError::from_application(error, correlation_id))
}

// ---------------------------------------------------------------------------
// Thread handlers
// ---------------------------------------------------------------------------

async fn list_threads(State(state): State<ApiState>) -> Result<Json<Vec<ThreadListItem>>, ApiError> {
    let correlation_id = new_correlation_id();
    let threads = state
        .threads
        .list()
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

    Ok(Json(threads.iter().map(ThreadListItem::from).collect()))
}

async fn get_thread(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    let correlation_id = new_correlation_id();
    let thread = load_thread(&state, &thread_id, &correlation_id).await?;
    Ok(Json(thread))
}

// ---------------------------------------------------------------------------
// Workflow handlers
// ---------------------------------------------------------------------------

async fn summarize(
    State(state): State<ApiState>,
    Json(body): Json<SummarizeRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let correlation_id = new_correlation_id();

    let thread_id = body.thread_id.filter(|id| !id.trim().is_empty()).ok_or_else(|| {
        ApiError::from_application(
            ApplicationError::Validation("thread_id is required".to_string()),
            &correlation_id,
        )
    })?;

    let thread = load_thread(&state, &thread_id, &correlation_id).await?;

    let existing = state
        .summaries
        .find_by_thread(&thread.thread_id)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

    // Draft regeneration is always allowed; overwriting human work is not,
    // unless the caller explicitly forces it.
    if let Some(previous) = &existing {
        if previous.state != SummaryState::Draft && !body.force {
            return Err(ApiError::from_application(
                ApplicationError::Conflict(format!(
                    "summary for thread `{thread_id}` is {}; pass force=true to regenerate",
                    previous.state.as_str()
                )),
                &correlation_id,
            ));
        }
    }

    let credential = body.llm_token.as_deref().or(state.default_llm_token.as_deref());
    let draft = state.generator.generate(&thread, &state.crm, credential).await;

    let mut summary = Summary::new_draft(
        thread.thread_id.clone(),
        draft.method,
        draft.draft_summary,
        draft.draft_fields,
    );
    if let Some(previous) = existing {
        summary.created_at = previous.created_at;
    }

    state
        .summaries
        .save(summary.clone())
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

    info!(
        event_name = "workflow.summary.drafted",
        correlation_id = %correlation_id,
        thread_id = %thread.thread_id,
        method = summary.method.as_str(),
        "draft summary persisted"
    );

    Ok(Json(SummaryResponse::new(&thread, summary)))
}

async fn get_summary(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let thread = load_thread(&state, &thread_id, &correlation_id).await?;
    let summary = load_summary(&state, &thread_id, &correlation_id).await?;
    Ok(Json(SummaryResponse::new(&thread, summary)))
}

async fn save_edit(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
    Json(body): Json<SaveEditRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let thread = load_thread(&state, &thread_id, &correlation_id).await?;
    let mut summary = load_summary(&state, &thread_id, &correlation_id).await?;

    summary
        .apply_edit(
            body.edited_summary.unwrap_or_default(),
            body.edited_fields.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        )
        .map_err(|error| {
            ApiError::from_application(ApplicationError::from(error), &correlation_id)
        })?;

    state
        .summaries
        .save(summary.clone())
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

    info!(
        event_name = "workflow.summary.edited",
        correlation_id = %correlation_id,
        thread_id = %thread.thread_id,
        "summary edit persisted"
    );

    Ok(Json(SummaryResponse::new(&thread, summary)))
}

async fn approve(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let correlation_id = new_correlation_id();

    let approver = body.approver.filter(|name| !name.trim().is_empty()).ok_or_else(|| {
        ApiError::from_application(
            ApplicationError::Validation("approver is required".to_string()),
            &correlation_id,
        )
    })?;

    let thread = load_thread(&state, &thread_id, &correlation_id).await?;
    let mut summary = load_summary(&state, &thread_id, &correlation_id).await?;

    summary.approve(approver.clone()).map_err(|error| {
        ApiError::from_application(ApplicationError::from(error), &correlation_id)
    })?;

    // Export before persisting the state change: an approval that cannot be
    // written to the audit log must not take effect.
    let record = ApprovedSummaryRecord {
        thread_id: thread.thread_id.0.clone(),
        subject: thread.subject.clone(),
        topic: thread.topic.clone(),
        order_id: thread.order_id.clone(),
        product: thread.product.clone(),
        approved_summary: summary.approved_summary.clone(),
        approved_fields: summary.approved_fields.clone(),
        approver,
        approved_at: summary.approved_at.unwrap_or_else(Utc::now),
    };
    let record_value = serde_json::to_value(&record).map_err(|error| {
        ApiError::from_application(
            ApplicationError::Integration(error.to_string()),
            &correlation_id,
        )
    })?;
    state
        .approved_log
        .append(record_value)
        .map_err(|error| ApiError::from_application(export(error), &correlation_id))?;

    state
        .summaries
        .save(summary.clone())
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

    info!(
        event_name = "workflow.summary.approved",
        correlation_id = %correlation_id,
        thread_id = %thread.thread_id,
        "summary approved and exported"
    );

    Ok(Json(SummaryResponse::new(&thread, summary)))
}

// ---------------------------------------------------------------------------
// CRM + admin handlers
// ---------------------------------------------------------------------------

async fn post_crm_note(
    State(state): State<ApiState>,
    Json(body): Json<CrmNoteRequest>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = new_correlation_id();

    let thread_id = body.thread_id.filter(|id| !id.trim().is_empty());
    let note = body.note.filter(|note| !note.trim().is_empty());
    let (Some(thread_id), Some(note)) = (thread_id, note) else {
        return Err(ApiError::from_application(
            ApplicationError::Validation("thread_id and note are required".to_string()),
            &correlation_id,
        ));
    };

    let record = CrmNoteRecord {
        thread_id: thread_id.clone(),
        note,
        metadata: body.metadata.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
    };
    let record_value = serde_json::to_value(&record).map_err(|error| {
        ApiError::from_application(
            ApplicationError::Integration(error.to_string()),
            &correlation_id,
        )
    })?;
    state
        .crm_notes_log
        .append(record_value)
        .map_err(|error| ApiError::from_application(export(error), &correlation_id))?;

    info!(
        event_name = "crm.note.posted",
        correlation_id = %correlation_id,
        thread_id = %thread_id,
        "CRM note appended"
    );

    Ok(Json(serde_json::json!({"status": "posted", "thread_id": thread_id})))
}

async fn admin_reset(
    State(state): State<ApiState>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = new_correlation_id();

    if let Some(thread_id) = body.thread_id {
        let thread = load_thread(&state, &thread_id, &correlation_id).await?;
        state
            .summaries
            .delete_by_thread(&thread.thread_id)
            .await
            .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

        info!(
            event_name = "admin.reset.single",
            correlation_id = %correlation_id,
            thread_id = %thread.thread_id,
            "summary reset for one thread; export logs untouched"
        );
        return Ok(Json(
            serde_json::json!({"status": "ok", "scope": "single", "thread_id": thread.thread_id.0}),
        ));
    }

    let removed = state
        .summaries
        .delete_all()
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;
    state
        .approved_log
        .truncate()
        .map_err(|error| ApiError::from_application(export(error), &correlation_id))?;
    state
        .crm_notes_log
        .truncate()
        .map_err(|error| ApiError::from_application(export(error), &correlation_id))?;

    info!(
        event_name = "admin.reset.all",
        correlation_id = %correlation_id,
        removed_summaries = removed,
        "all summaries deleted and export logs truncated"
    );

    Ok(Json(serde_json::json!({"status": "ok", "scope": "all", "removed": removed})))
}

async fn admin_ingest(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let correlation_id = new_correlation_id();

    let result = fixtures::ingest_threads(state.threads.as_ref(), fixtures::sample_threads())
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &correlation_id))?;

    info!(
        event_name = "admin.ingest.completed",
        correlation_id = %correlation_id,
        created = result.created,
        updated = result.updated,
        "sample threads ingested"
    );

    Ok(Json(serde_json::json!({
        "status": "ok",
        "created": result.created,
        "updated": result.updated,
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use casenote_agent::DraftGenerator;
    use casenote_core::crm::CrmDirectory;
    use casenote_core::export::{InMemoryExportSink, JsonlExportLog};
    use casenote_db::fixtures::sample_threads;
    use casenote_db::repositories::{InMemorySummaryRepository, InMemoryThreadRepository};
    use tempfile::TempDir;

    use super::{router, ApiState};

    struct Harness {
        app: Router,
        approved_log: InMemoryExportSink,
        crm_notes_log: InMemoryExportSink,
    }

    fn harness() -> Harness {
        let approved_log = InMemoryExportSink::default();
        let crm_notes_log = InMemoryExportSink::default();
        let state = ApiState::new(
            Arc::new(InMemoryThreadRepository::with_threads(sample_threads())),
            Arc::new(InMemorySummaryRepository::default()),
            Arc::new(CrmDirectory::bundled()),
            Arc::new(DraftGenerator::rule_based()),
            Arc::new(approved_log.clone()),
            Arc::new(crm_notes_log.clone()),
            None,
        );
        Harness { app: router(state), approved_log, crm_notes_log }
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                builder.body(Body::from(value.to_string())).expect("request")
            }
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, payload)
    }

    #[tokio::test]
    async fn lists_ingested_threads() {
        let harness = harness();
        let (status, body) = send(&harness.app, Method::GET, "/api/threads/", None).await;

        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["thread_id"], "CE-405467-683");
    }

    #[tokio::test]
    async fn thread_detail_includes_messages() {
        let harness = harness();
        let (status, body) =
            send(&harness.app, Method::GET, "/api/threads/CE-405467-683/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body["messages"].as_array().expect("messages").is_empty());

        let (status, _) = send(&harness.app, Method::GET, "/api/threads/CE-999/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summarize_produces_rule_based_draft() {
        let harness = harness();
        let (status, body) = send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-405467-683"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "rule-based");
        assert_eq!(body["state"], "DRAFT");
        assert_eq!(body["draft_fields"]["issue_type"], "damaged_item");
        assert_eq!(body["draft_fields"]["recommended_disposition"], "Refund");
        assert_eq!(body["thread"]["order_id"], "ORD-71023");
    }

    #[tokio::test]
    async fn summarize_rejects_missing_or_unknown_thread() {
        let harness = harness();

        let (status, body) =
            send(&harness.app, Method::POST, "/api/summarize", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["correlation_id"].as_str().expect("correlation id").len() > 0);

        let (status, _) = send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-000000-000"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resummarize_conflicts_after_edit_unless_forced() {
        let harness = harness();
        let body = json!({"thread_id": "CE-421881-552"});
        let (status, _) =
            send(&harness.app, Method::POST, "/api/summarize", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-421881-552/save-edit",
            Some(json!({"edited_summary": "Customer prefers store credit."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, error) =
            send(&harness.app, Method::POST, "/api/summarize", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(error["detail"].as_str().expect("detail").contains("force"));

        let (status, fresh) = send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-421881-552", "force": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fresh["state"], "DRAFT");
        assert_eq!(fresh["edited_summary"], "");
    }

    #[tokio::test]
    async fn edit_then_approve_exports_merged_fields() {
        let harness = harness();
        send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-421881-552"})),
        )
        .await;

        let (status, _) = send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-421881-552/save-edit",
            Some(json!({
                "edited_summary": "Wrong size shipped; replacement authorized.",
                "edited_fields": {"rma_id": "RMA-1427"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, approved) = send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-421881-552/approve",
            Some(json!({"approver": "t.alvarez"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["state"], "APPROVED");
        assert_eq!(approved["approver"], "t.alvarez");
        assert_eq!(approved["approved_fields"]["rma_id"], "RMA-1427");
        assert_eq!(approved["approved_fields"]["issue_type"], "wrong_variant");

        let records = harness.approved_log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["thread_id"], "CE-421881-552");
        assert_eq!(records[0]["approver"], "t.alvarez");
        assert_eq!(records[0]["approved_fields"]["rma_id"], "RMA-1427");
    }

    #[tokio::test]
    async fn approval_lands_on_disk_as_the_last_jsonl_line() {
        let dir = TempDir::new().expect("tempdir");
        let log_path = dir.path().join("approved_summaries.jsonl");
        let state = ApiState::new(
            Arc::new(InMemoryThreadRepository::with_threads(sample_threads())),
            Arc::new(InMemorySummaryRepository::default()),
            Arc::new(CrmDirectory::bundled()),
            Arc::new(DraftGenerator::rule_based()),
            Arc::new(JsonlExportLog::new(log_path.clone())),
            Arc::new(InMemoryExportSink::default()),
            None,
        );
        let app = router(state);

        send(
            &app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-421881-552"})),
        )
        .await;
        send(
            &app,
            Method::POST,
            "/api/summary/CE-421881-552/save-edit",
            Some(json!({"edited_fields": {"rma_id": "RMA-1427"}})),
        )
        .await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/summary/CE-421881-552/approve",
            Some(json!({"approver": "t.alvarez"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let raw = std::fs::read_to_string(&log_path).expect("approved log on disk");
        let last_line = raw.lines().last().expect("at least one record");
        assert!(last_line.contains(r#""rma_id":"RMA-1427""#));

        let record: Value = serde_json::from_str(last_line).expect("jsonl record");
        assert_eq!(record["thread_id"], "CE-421881-552");
        assert_eq!(record["approved_fields"]["rma_id"], "RMA-1427");
    }

    #[tokio::test]
    async fn approve_requires_an_existing_summary() {
        let harness = harness();
        let (status, _) = send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-405467-683/approve",
            Some(json!({"approver": "t.alvarez"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(harness.approved_log.records().is_empty());
    }

    #[tokio::test]
    async fn approved_summary_rejects_further_edits() {
        let harness = harness();
        send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-417220-104"})),
        )
        .await;
        send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-417220-104/approve",
            Some(json!({"approver": "t.alvarez"})),
        )
        .await;

        let (status, _) = send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-417220-104/save-edit",
            Some(json!({"edited_summary": "too late"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn crm_note_validates_and_appends() {
        let harness = harness();
        let (status, _) = send(
            &harness.app,
            Method::POST,
            "/api/crm/post-note",
            Some(json!({"thread_id": "CE-405467-683"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &harness.app,
            Method::POST,
            "/api/crm/post-note",
            Some(json!({
                "thread_id": "CE-405467-683",
                "note": "Refund issued for damaged lamp.",
                "metadata": {"channel": "email"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "posted");

        let records = harness.crm_notes_log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["note"], "Refund issued for damaged lamp.");
        assert_eq!(records[0]["metadata"]["channel"], "email");
    }

    #[tokio::test]
    async fn reset_single_thread_keeps_export_logs() {
        let harness = harness();
        send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-405467-683"})),
        )
        .await;
        send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-405467-683/approve",
            Some(json!({"approver": "t.alvarez"})),
        )
        .await;

        let (status, body) = send(
            &harness.app,
            Method::POST,
            "/api/admin/reset",
            Some(json!({"thread_id": "CE-405467-683"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scope"], "single");

        let (status, _) =
            send(&harness.app, Method::GET, "/api/summary/CE-405467-683", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(harness.approved_log.records().len(), 1);
    }

    #[tokio::test]
    async fn reset_all_truncates_export_logs() {
        let harness = harness();
        send(
            &harness.app,
            Method::POST,
            "/api/summarize",
            Some(json!({"thread_id": "CE-405467-683"})),
        )
        .await;
        send(
            &harness.app,
            Method::POST,
            "/api/summary/CE-405467-683/approve",
            Some(json!({"approver": "t.alvarez"})),
        )
        .await;
        send(
            &harness.app,
            Method::POST,
            "/api/crm/post-note",
            Some(json!({"thread_id": "CE-405467-683", "note": "Refund issued."})),
        )
        .await;

        let (status, body) =
            send(&harness.app, Method::POST, "/api/admin/reset", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scope"], "all");
        assert_eq!(body["removed"], 1);

        assert!(harness.approved_log.records().is_empty());
        assert!(harness.crm_notes_log.records().is_empty());
    }

    #[tokio::test]
    async fn ingest_is_idempotent_across_calls() {
        let state = ApiState::new(
            Arc::new(InMemoryThreadRepository::default()),
            Arc::new(InMemorySummaryRepository::default()),
            Arc::new(CrmDirectory::bundled()),
            Arc::new(DraftGenerator::rule_based()),
            Arc::new(InMemoryExportSink::default()),
            Arc::new(InMemoryExportSink::default()),
            None,
        );
        let app = router(state);

        let (status, body) = send(&app, Method::POST, "/api/admin/ingest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], 3);
        assert_eq!(body["updated"], 0);

        let (status, body) = send(&app, Method::POST, "/api/admin/ingest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], 0);
        assert_eq!(body["updated"], 3);
    }
}
