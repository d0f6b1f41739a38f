use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::thread::ThreadId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SummaryState {
    Draft,
    Edited,
    Approved,
}

impl SummaryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Edited => "EDITED",
            Self::Approved => "APPROVED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "DRAFT" => Some(Self::Draft),
            "EDITED" => Some(Self::Edited),
            "APPROVED" => Some(Self::Approved),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMethod {
    #[serde(rename = "rule-based")]
    RuleBased,
    #[serde(rename = "llm")]
    Llm,
}

impl GenerationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleBased => "rule-based",
            Self::Llm => "llm",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "rule-based" => Some(Self::RuleBased),
            "llm" => Some(Self::Llm),
            _ => None,
        }
    }
}

/// The generated/edited/approved case write-up tied to one thread. At most
/// one Summary exists per thread at any time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub thread_id: ThreadId,
    pub method: GenerationMethod,
    pub draft_summary: String,
    pub draft_fields: Value,
    pub edited_summary: String,
    pub edited_fields: Value,
    pub approved_summary: String,
    pub approved_fields: Value,
    pub state: SummaryState,
    pub approver: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Summary {
    pub fn new_draft(
        thread_id: ThreadId,
        method: GenerationMethod,
        draft_summary: String,
        draft_fields: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            thread_id,
            method,
            draft_summary,
            draft_fields,
            edited_summary: String::new(),
            edited_fields: Value::Object(serde_json::Map::new()),
            approved_summary: String::new(),
            approved_fields: Value::Object(serde_json::Map::new()),
            state: SummaryState::Draft,
            approver: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: SummaryState) -> bool {
        matches!(
            (self.state, next),
            (SummaryState::Draft, SummaryState::Edited)
                | (SummaryState::Draft, SummaryState::Approved)
                | (SummaryState::Edited, SummaryState::Edited)
                | (SummaryState::Edited, SummaryState::Approved)
        )
    }

    fn transition_to(&mut self, next: SummaryState) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.state = next;
            return Ok(());
        }

        Err(DomainError::InvalidSummaryTransition { from: self.state, to: next })
    }

    /// Records a human edit. Edited fields are merged key-by-key over whatever
    /// was edited before, so partial edits accumulate.
    pub fn apply_edit(&mut self, edited_summary: String, edited_fields: Value) -> Result<(), DomainError> {
        self.transition_to(SummaryState::Edited)?;
        self.edited_summary = edited_summary;
        merge_fields(&mut self.edited_fields, edited_fields);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Approves the summary. If the human never edited, approval copies the
    /// draft content; otherwise draft fields merged with the edits win.
    pub fn approve(&mut self, approver: String) -> Result<(), DomainError> {
        self.transition_to(SummaryState::Approved)?;

        self.approved_summary = if self.edited_summary.is_empty() {
            self.draft_summary.clone()
        } else {
            self.edited_summary.clone()
        };

        let mut fields = self.draft_fields.clone();
        merge_fields(&mut fields, self.edited_fields.clone());
        self.approved_fields = fields;

        let now = Utc::now();
        self.approver = Some(approver);
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// Shallow JSON-object merge: keys in `incoming` overwrite keys in `base`.
/// Non-object incoming values replace the base wholesale.
pub fn merge_fields(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                base_map.insert(key, value);
            }
        }
        (base_slot, incoming_value) => *base_slot = incoming_value,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::thread::ThreadId;

    use super::{GenerationMethod, Summary, SummaryState};

    fn draft() -> Summary {
        Summary::new_draft(
            ThreadId("CE-405467-683".to_string()),
            GenerationMethod::RuleBased,
            "Issue appears to be damaged item.".to_string(),
            json!({"issue_type": "damaged_item", "current_status": "Unresolved"}),
        )
    }

    #[test]
    fn draft_can_be_approved_directly() {
        let mut summary = draft();
        summary.approve("santosh.b".to_string()).expect("draft -> approved");

        assert_eq!(summary.state, SummaryState::Approved);
        assert_eq!(summary.approver.as_deref(), Some("santosh.b"));
        assert!(summary.approved_at.is_some());
        // Never edited, so approval copies the draft.
        assert_eq!(summary.approved_summary, summary.draft_summary);
        assert_eq!(summary.approved_fields["issue_type"], "damaged_item");
    }

    #[test]
    fn edits_accumulate_and_win_at_approval() {
        let mut summary = draft();
        summary
            .apply_edit("Customer confirmed damage.".to_string(), json!({"rma_id": "RMA-1427"}))
            .expect("draft -> edited");
        summary
            .apply_edit("Customer confirmed damage, refund due.".to_string(), json!({"sla_risk": true}))
            .expect("edited -> edited");

        assert_eq!(summary.edited_fields["rma_id"], "RMA-1427");
        assert_eq!(summary.edited_fields["sla_risk"], true);

        summary.approve("santosh.b".to_string()).expect("edited -> approved");
        assert_eq!(summary.approved_summary, "Customer confirmed damage, refund due.");
        assert_eq!(summary.approved_fields["rma_id"], "RMA-1427");
        // Untouched draft fields survive the merge.
        assert_eq!(summary.approved_fields["issue_type"], "damaged_item");
    }

    #[test]
    fn approved_summary_rejects_further_edits() {
        let mut summary = draft();
        summary.approve("santosh.b".to_string()).expect("draft -> approved");

        let error = summary
            .apply_edit("late edit".to_string(), json!({}))
            .expect_err("approved summaries are immutable");
        assert!(matches!(
            error,
            crate::errors::DomainError::InvalidSummaryTransition {
                from: SummaryState::Approved,
                to: SummaryState::Edited
            }
        ));
    }

    #[test]
    fn approve_twice_is_rejected() {
        let mut summary = draft();
        summary.approve("santosh.b".to_string()).expect("draft -> approved");
        assert!(summary.approve("maria.k".to_string()).is_err());
        assert_eq!(summary.approver.as_deref(), Some("santosh.b"));
    }
}
