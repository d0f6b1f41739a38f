//! LLM adapter for draft generation.
//!
//! The client speaks the OpenAI-compatible chat completions API (Groq by
//! default). Every failure mode collapses into `LlmError::Unavailable`:
//! invalid credential, network failure, timeout, or a response missing the
//! required structured fields. Callers treat that error as a signal to fall
//! back to the rule-based classifier, never as a hard failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use casenote_core::classify::{Disposition, IssueType};
use casenote_core::crm::CrmSnapshot;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm unavailable: {0}")]
    Unavailable(String),
}

/// The thread material handed to the model. Assembled by the caller so the
/// client itself never touches repositories.
#[derive(Clone, Debug, Serialize)]
pub struct LlmRequest {
    pub thread_id: String,
    pub subject: String,
    pub order_id: String,
    pub product: String,
    pub thread_text: String,
    pub crm_snapshot: CrmSnapshot,
}

/// Validated structured response from the model. Construction goes through
/// [`LlmDraft::from_response`], which rejects anything missing or off-vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmDraft {
    pub summary: String,
    pub issue_type: IssueType,
    pub current_status: String,
    pub recommended_disposition: Disposition,
    pub next_actions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    summary: Option<String>,
    issue_type: Option<String>,
    current_status: Option<String>,
    recommended_disposition: Option<String>,
    next_actions: Option<Vec<String>>,
}

impl LlmDraft {
    /// Parses the model's JSON payload, requiring every field the workflow
    /// depends on. A draft that fails here counts as an LLM failure.
    pub fn from_response(raw: &str) -> Result<Self, LlmError> {
        let parsed: RawDraft = serde_json::from_str(extract_json_object(raw))
            .map_err(|error| LlmError::Unavailable(format!("malformed response: {error}")))?;

        let summary = parsed
            .summary
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| missing("summary"))?;
        let issue_type = parsed
            .issue_type
            .as_deref()
            .and_then(IssueType::parse)
            .ok_or_else(|| missing("issue_type"))?;
        let current_status = parsed
            .current_status
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| missing("current_status"))?;
        let recommended_disposition = parsed
            .recommended_disposition
            .as_deref()
            .and_then(Disposition::parse)
            .ok_or_else(|| missing("recommended_disposition"))?;
        let next_actions = parsed.next_actions.ok_or_else(|| missing("next_actions"))?;

        Ok(Self { summary, issue_type, current_status, recommended_disposition, next_actions })
    }
}

fn missing(field: &str) -> LlmError {
    LlmError::Unavailable(format!("response missing required field `{field}`"))
}

/// Models occasionally wrap JSON in prose or code fences; take the outermost
/// object if one exists.
fn extract_json_object(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => raw,
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Lightweight credential check, cheaper than a full completion.
    async fn probe(&self, credential: &str) -> Result<(), LlmError>;
    async fn summarize(&self, request: &LlmRequest, credential: &str)
        -> Result<LlmDraft, LlmError>;
}

pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GroqClient {
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Unavailable(format!("client init failed: {error}")))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), model })
    }

    fn prompt(request: &LlmRequest) -> String {
        let crm = serde_json::to_string(&request.crm_snapshot).unwrap_or_else(|_| "{}".to_string());
        format!(
            "You are a customer-service case summarizer. Summarize the email thread below \
             and respond with ONLY a JSON object with these exact keys: \
             \"summary\" (string), \
             \"issue_type\" (one of: damaged_item, late_delivery, wrong_variant, general_inquiry), \
             \"current_status\" (string), \
             \"recommended_disposition\" (one of: Refund, Replacement, Return, Agent to confirm with customer), \
             \"next_actions\" (array of strings).\n\n\
             Thread {thread_id} — subject: {subject}; order: {order_id}; product: {product}.\n\
             CRM context: {crm}\n\n\
             Messages:\n{thread_text}",
            thread_id = request.thread_id,
            subject = request.subject,
            order_id = request.order_id,
            product = request.product,
            thread_text = request.thread_text,
        )
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn probe(&self, credential: &str) -> Result<(), LlmError> {
        if credential.trim().is_empty() {
            return Err(LlmError::Unavailable("empty credential".to_string()));
        }

        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|error| LlmError::Unavailable(format!("probe failed: {error}")))?;

        if !response.status().is_success() {
            return Err(LlmError::Unavailable(format!(
                "credential rejected with status {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn summarize(
        &self,
        request: &LlmRequest,
        credential: &str,
    ) -> Result<LlmDraft, LlmError> {
        let prompt = Self::prompt(request);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &prompt }],
            temperature: 0.0,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Unavailable(format!("completion failed: {error}")))?;

        if !response.status().is_success() {
            return Err(LlmError::Unavailable(format!(
                "completion rejected with status {}",
                response.status()
            )));
        }

        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| LlmError::Unavailable(format!("malformed envelope: {error}")))?;
        let content = payload
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| LlmError::Unavailable("response contained no choices".to_string()))?;

        LlmDraft::from_response(content)
    }
}
