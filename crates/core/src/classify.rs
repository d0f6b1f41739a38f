//! Rule-based thread classifier.
//!
//! Scans the concatenated message text for fixed keyword sets, derives issue
//! type, customer-ask signals, recommended disposition, and next actions, and
//! enriches the result with a CRM snapshot. Deterministic: the same thread and
//! CRM data always produce the same output, and every derived value traces
//! back to a token present in the thread or a CRM field.

use serde::{Deserialize, Serialize};

use crate::crm::{CrmDirectory, CrmSnapshot};
use crate::domain::thread::Thread;

const DAMAGED_TOKENS: &[&str] = &["damage", "damaged", "broken", "defective"];
const DELAY_TOKENS: &[&str] = &["late", "delayed", "delay"];
const WRONG_VARIANT_TOKENS: &[&str] = &["wrong", "size", "color", "variant"];
const REFUND_TOKENS: &[&str] = &["refund", "credit"];
const REPLACEMENT_TOKENS: &[&str] = &["replace", "replacement"];
const RETURN_TOKENS: &[&str] = &["return", "rma"];
const PHOTOS_TOKENS: &[&str] = &["photo", "photos", "picture", "pictures", "image"];
const ADDRESS_TOKENS: &[&str] = &["address"];
const TRACKING_TOKENS: &[&str] = &["tracking", "carrier"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    DamagedItem,
    LateDelivery,
    WrongVariant,
    GeneralInquiry,
}

impl IssueType {
    /// Stable identifier used in structured fields.
    pub fn id(&self) -> &'static str {
        match self {
            Self::DamagedItem => "damaged_item",
            Self::LateDelivery => "late_delivery",
            Self::WrongVariant => "wrong_variant",
            Self::GeneralInquiry => "general_inquiry",
        }
    }

    /// Human-readable label used in draft summary prose.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DamagedItem => "Damaged item on arrival",
            Self::LateDelivery => "Late delivery",
            Self::WrongVariant => "Wrong variant received",
            Self::GeneralInquiry => "General inquiry",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "damaged_item" | "damaged item on arrival" => Some(Self::DamagedItem),
            "late_delivery" | "late delivery" => Some(Self::LateDelivery),
            "wrong_variant" | "wrong variant received" => Some(Self::WrongVariant),
            "general_inquiry" | "general inquiry" => Some(Self::GeneralInquiry),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Refund,
    Replacement,
    Return,
    #[serde(rename = "Agent to confirm with customer")]
    ConfirmWithCustomer,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Refund => "Refund",
            Self::Replacement => "Replacement",
            Self::Return => "Return",
            Self::ConfirmWithCustomer => "Agent to confirm with customer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "refund" => Some(Self::Refund),
            "replacement" => Some(Self::Replacement),
            "return" => Some(Self::Return),
            "agent to confirm with customer" | "confirm_with_customer" => {
                Some(Self::ConfirmWithCustomer)
            }
            _ => None,
        }
    }
}

/// Structured fields attached to a draft. Serialized into the summary record
/// and the approved-summaries export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftFields {
    pub thread_id: String,
    pub order_id: String,
    pub product: String,
    pub initiated_by: String,
    pub issue_type: IssueType,
    pub customer_ask: Vec<String>,
    pub attachments_needed: Vec<String>,
    pub current_status: String,
    pub recommended_disposition: Disposition,
    pub next_actions: Vec<String>,
    pub sla_risk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rma_id: Option<String>,
    pub crm_snapshot: CrmSnapshot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DraftOutput {
    pub draft_summary: String,
    pub draft_fields: DraftFields,
}

fn contains_any(text: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| text.contains(token))
}

/// Classifies a thread and renders its draft summary. CRM enrichment comes
/// from the directory keyed by the thread's order id.
pub fn classify_thread(thread: &Thread, crm: &CrmDirectory) -> DraftOutput {
    let text = thread.full_text().to_lowercase();

    // Issue classification, first match wins in fixed priority order.
    let issue_type = if contains_any(&text, DAMAGED_TOKENS) {
        IssueType::DamagedItem
    } else if contains_any(&text, DELAY_TOKENS) {
        IssueType::LateDelivery
    } else if contains_any(&text, WRONG_VARIANT_TOKENS) {
        IssueType::WrongVariant
    } else {
        IssueType::GeneralInquiry
    };

    // Customer-ask signals, collected in a fixed order.
    let ask_table: &[(&str, &[&str])] = &[
        ("Refund", REFUND_TOKENS),
        ("Replacement", REPLACEMENT_TOKENS),
        ("Return", RETURN_TOKENS),
        ("Photos", PHOTOS_TOKENS),
        ("Address", ADDRESS_TOKENS),
        ("Tracking", TRACKING_TOKENS),
    ];
    let customer_ask: Vec<String> = ask_table
        .iter()
        .filter(|(_, tokens)| contains_any(&text, tokens))
        .map(|(name, _)| (*name).to_string())
        .collect();

    let asked = |name: &str| customer_ask.iter().any(|ask| ask == name);

    let mut next_actions: Vec<String> = Vec::new();
    if asked("Photos") || issue_type == IssueType::DamagedItem {
        next_actions.push("Request photos of the issue".to_string());
    }
    if asked("Return")
        || matches!(issue_type, IssueType::DamagedItem | IssueType::WrongVariant)
    {
        next_actions.push("Generate RMA & return label".to_string());
    }
    if asked("Refund") {
        next_actions.push("Process refund on carrier scan".to_string());
    }
    if asked("Replacement") {
        next_actions.push("Offer replacement if stock available".to_string());
    }

    let recommended = if asked("Refund") {
        Disposition::Refund
    } else if asked("Replacement") {
        Disposition::Replacement
    } else if asked("Return") {
        Disposition::Return
    } else {
        Disposition::ConfirmWithCustomer
    };

    let crm_snapshot = crm.snapshot_for(&thread.order_id);

    // Refine the replacement wording once stock availability is known.
    match crm_snapshot.stock_available {
        Some(true) => {
            refine_action(&mut next_actions, "Offer replacement (stock available)");
        }
        Some(false) => {
            refine_action(&mut next_actions, "Offer replacement (backorder or OOS)");
        }
        None => {}
    }

    let attachments_needed = if issue_type == IssueType::DamagedItem {
        vec!["Damage photos".to_string()]
    } else {
        Vec::new()
    };

    let draft_summary = render_summary(thread, issue_type, &customer_ask, recommended, &next_actions, &crm_snapshot);

    DraftOutput {
        draft_summary,
        draft_fields: DraftFields {
            thread_id: thread.thread_id.0.clone(),
            order_id: thread.order_id.clone(),
            product: thread.product.clone(),
            initiated_by: thread.initiated_by.clone(),
            issue_type,
            customer_ask,
            attachments_needed,
            current_status: "Unresolved".to_string(),
            recommended_disposition: recommended,
            next_actions,
            sla_risk: false,
            rma_id: None,
            crm_snapshot,
        },
    }
}

fn refine_action(actions: &mut [String], replacement: &str) {
    for action in actions.iter_mut() {
        if action == "Offer replacement if stock available" {
            *action = replacement.to_string();
        }
    }
}

fn render_summary(
    thread: &Thread,
    issue_type: IssueType,
    customer_ask: &[String],
    recommended: Disposition,
    next_actions: &[String],
    crm_snapshot: &CrmSnapshot,
) -> String {
    let asks =
        if customer_ask.is_empty() { "N/A".to_string() } else { customer_ask.join(", ") };
    let actions = if next_actions.is_empty() {
        "Confirm details with customer".to_string()
    } else {
        next_actions.join(", ")
    };

    let mut crm_bits: Vec<String> = Vec::new();
    if let Some(policy) = &crm_snapshot.policy {
        crm_bits.push(format!("Policy: {policy}."));
    }
    if let Some(status) = &crm_snapshot.order_status {
        crm_bits.push(format!("Order status: {status}."));
    }
    let crm_tail =
        if crm_bits.is_empty() { String::new() } else { format!(" {}", crm_bits.join(" ")) };

    format!(
        "Issue appears to be **{issue}** for order **{order}** ({product}). \
         Initiated by **{initiator}**. Customer mentions: {asks}. \
         Recommend: {recommend}. Next actions: {actions}.{crm_tail}",
        issue = issue_type.label(),
        order = thread.order_id,
        product = thread.product,
        initiator = thread.initiated_by,
        recommend = recommended.label(),
    )
}
