//! Draft generation: LLM first when a credential is available, rule-based
//! classifier otherwise or on any LLM failure.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use casenote_core::classify::classify_thread;
use casenote_core::crm::CrmDirectory;
use casenote_core::domain::summary::GenerationMethod;
use casenote_core::domain::thread::Thread;

use crate::llm::{LlmClient, LlmRequest};

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedDraft {
    pub method: GenerationMethod,
    pub draft_summary: String,
    pub draft_fields: Value,
}

pub struct DraftGenerator {
    llm: Option<Arc<dyn LlmClient>>,
}

impl DraftGenerator {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    /// Rule-based only; never attempts the network.
    pub fn rule_based() -> Self {
        Self { llm: None }
    }

    /// Produces a draft for the thread. The credential is caller-supplied per
    /// request; without one the rule-based path runs directly. LLM failures
    /// are absorbed here and degrade the method, they never propagate.
    pub async fn generate(
        &self,
        thread: &Thread,
        crm: &CrmDirectory,
        credential: Option<&str>,
    ) -> GeneratedDraft {
        let rule_output = classify_thread(thread, crm);

        if let (Some(llm), Some(credential)) = (&self.llm, credential) {
            match self.try_llm(llm.as_ref(), thread, &rule_output, credential).await {
                Ok(draft) => return draft,
                Err(error) => {
                    warn!(
                        event_name = "agent.llm.fallback",
                        thread_id = %thread.thread_id,
                        error = %error,
                        "llm draft failed, falling back to rule-based classifier"
                    );
                }
            }
        }

        let draft_fields = serde_json::to_value(&rule_output.draft_fields)
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        GeneratedDraft {
            method: GenerationMethod::RuleBased,
            draft_summary: rule_output.draft_summary,
            draft_fields,
        }
    }

    async fn try_llm(
        &self,
        llm: &dyn LlmClient,
        thread: &Thread,
        rule_output: &casenote_core::classify::DraftOutput,
        credential: &str,
    ) -> Result<GeneratedDraft, crate::llm::LlmError> {
        llm.probe(credential).await?;

        let request = LlmRequest {
            thread_id: thread.thread_id.0.clone(),
            subject: thread.subject.clone(),
            order_id: thread.order_id.clone(),
            product: thread.product.clone(),
            thread_text: thread.full_text(),
            crm_snapshot: rule_output.draft_fields.crm_snapshot.clone(),
        };
        let llm_draft = llm.summarize(&request, credential).await?;

        // The classifier's token-grounded fields stay as the base; the model
        // only overrides the narrative and the fields it was asked for.
        let mut fields = rule_output.draft_fields.clone();
        fields.issue_type = llm_draft.issue_type;
        fields.current_status = llm_draft.current_status;
        fields.recommended_disposition = llm_draft.recommended_disposition;
        fields.next_actions = llm_draft.next_actions;

        let draft_fields = serde_json::to_value(&fields)
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        info!(
            event_name = "agent.llm.draft_generated",
            thread_id = %thread.thread_id,
            "llm draft accepted"
        );

        Ok(GeneratedDraft {
            method: GenerationMethod::Llm,
            draft_summary: llm_draft.summary,
            draft_fields,
        })
    }
}
