pub mod generator;
pub mod llm;

pub use generator::{DraftGenerator, GeneratedDraft};
pub use llm::{GroqClient, LlmClient, LlmDraft, LlmError, LlmRequest};
