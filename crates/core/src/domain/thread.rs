use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message inside an ingested email thread. Timestamps are kept as the
/// raw strings delivered by the mail export, never reparsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub timestamp: String,
    pub body: String,
}

/// An ingested customer-service email thread. Created once at ingest and
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: ThreadId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub initiated_by: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Thread {
    /// Concatenated body text of every message, in thread order. This is the
    /// classifier's scan input.
    pub fn full_text(&self) -> String {
        self.messages.iter().map(|m| m.body.as_str()).collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, Thread, ThreadId};

    #[test]
    fn full_text_joins_messages_in_order() {
        let thread = Thread {
            thread_id: ThreadId("CE-1".to_string()),
            subject: String::new(),
            topic: String::new(),
            initiated_by: String::new(),
            order_id: String::new(),
            product: String::new(),
            messages: vec![
                Message {
                    id: "m1".to_string(),
                    sender: "customer".to_string(),
                    timestamp: "2026-01-04T09:00:00Z".to_string(),
                    body: "The lamp arrived".to_string(),
                },
                Message {
                    id: "m2".to_string(),
                    sender: "customer".to_string(),
                    timestamp: "2026-01-04T09:01:00Z".to_string(),
                    body: "broken in the box".to_string(),
                },
            ],
        };

        assert_eq!(thread.full_text(), "The lamp arrived broken in the box");
    }
}
