//! Bundled sample threads and the ingest routine.
//!
//! Ingest is update-or-create by thread id so re-running it converges on the
//! same dataset. The samples line up with the bundled CRM directory in
//! `casenote-core`.

use serde::Deserialize;

use casenote_core::domain::thread::{Message, Thread, ThreadId};

use crate::repositories::{RepositoryError, ThreadRepository};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestResult {
    pub created: u64,
    pub updated: u64,
}

struct SampleMessage {
    id: &'static str,
    sender: &'static str,
    timestamp: &'static str,
    body: &'static str,
}

struct SampleThread {
    thread_id: &'static str,
    subject: &'static str,
    topic: &'static str,
    initiated_by: &'static str,
    order_id: &'static str,
    product: &'static str,
    messages: &'static [SampleMessage],
}

const SAMPLE_THREADS: &[SampleThread] = &[
    SampleThread {
        thread_id: "CE-405467-683",
        subject: "Lamp arrived damaged",
        topic: "damage-claim",
        initiated_by: "customer",
        order_id: "ORD-71023",
        product: "Aurora Desk Lamp",
        messages: &[
            SampleMessage {
                id: "m1",
                sender: "priya.raman@example.com",
                timestamp: "2026-01-04T09:12:00Z",
                body: "Hi, my desk lamp arrived damaged. The glass shade is shattered and the \
                       base is dented. I would like a refund please.",
            },
            SampleMessage {
                id: "m2",
                sender: "support@shop.example.com",
                timestamp: "2026-01-04T10:02:00Z",
                body: "Sorry to hear that! Could you send photos of the damage so we can start \
                       the claim?",
            },
            SampleMessage {
                id: "m3",
                sender: "priya.raman@example.com",
                timestamp: "2026-01-04T10:31:00Z",
                body: "Photos attached. Please process the refund to my original payment method.",
            },
        ],
    },
    SampleThread {
        thread_id: "CE-417220-104",
        subject: "Where is my order?",
        topic: "shipping",
        initiated_by: "customer",
        order_id: "ORD-71547",
        product: "Trailhead Backpack 28L",
        messages: &[
            SampleMessage {
                id: "m1",
                sender: "d.okafor@example.com",
                timestamp: "2026-01-06T14:45:00Z",
                body: "My backpack is a week late. The tracking page has not updated since last \
                       Tuesday. Which carrier is handling this?",
            },
            SampleMessage {
                id: "m2",
                sender: "support@shop.example.com",
                timestamp: "2026-01-06T15:20:00Z",
                body: "Checking with the carrier now, we will follow up with updated tracking.",
            },
        ],
    },
    SampleThread {
        thread_id: "CE-421881-552",
        subject: "Received the wrong size",
        topic: "exchange",
        initiated_by: "customer",
        order_id: "ORD-72011",
        product: "Merino Crew Sweater",
        messages: &[
            SampleMessage {
                id: "m1",
                sender: "meiling.chou@example.com",
                timestamp: "2026-01-08T08:03:00Z",
                body: "I ordered a medium but received a small. Wrong size entirely. Can you \
                       send a replacement? Happy to return this one.",
            },
            SampleMessage {
                id: "m2",
                sender: "support@shop.example.com",
                timestamp: "2026-01-08T09:10:00Z",
                body: "Apologies for the mix-up. We will arrange a return label and check \
                       replacement stock.",
            },
        ],
    },
];

/// The canonical demo dataset, one `Thread` per sample.
pub fn sample_threads() -> Vec<Thread> {
    SAMPLE_THREADS
        .iter()
        .map(|sample| Thread {
            thread_id: ThreadId(sample.thread_id.to_string()),
            subject: sample.subject.to_string(),
            topic: sample.topic.to_string(),
            initiated_by: sample.initiated_by.to_string(),
            order_id: sample.order_id.to_string(),
            product: sample.product.to_string(),
            messages: sample
                .messages
                .iter()
                .map(|message| Message {
                    id: message.id.to_string(),
                    sender: message.sender.to_string(),
                    timestamp: message.timestamp.to_string(),
                    body: message.body.to_string(),
                })
                .collect(),
        })
        .collect()
}

/// Upserts the given threads, counting creations versus updates.
pub async fn ingest_threads(
    repo: &dyn ThreadRepository,
    threads: Vec<Thread>,
) -> Result<IngestResult, RepositoryError> {
    let mut result = IngestResult::default();
    for thread in threads {
        if repo.upsert(thread).await? {
            result.created += 1;
        } else {
            result.updated += 1;
        }
    }
    Ok(result)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ThreadsFile {
    Wrapped { threads: Vec<Thread> },
    Bare(Vec<Thread>),
}

/// Parses an external threads file. Accepts either a bare array or an object
/// with a `threads` key, matching the historical export format.
pub fn parse_threads_file(raw: &str) -> Result<Vec<Thread>, serde_json::Error> {
    Ok(match serde_json::from_str::<ThreadsFile>(raw)? {
        ThreadsFile::Wrapped { threads } => threads,
        ThreadsFile::Bare(threads) => threads,
    })
}
