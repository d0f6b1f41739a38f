pub mod classify;
pub mod config;
pub mod crm;
pub mod domain;
pub mod errors;
pub mod export;

pub use classify::{classify_thread, DraftFields, DraftOutput, Disposition, IssueType};
pub use crm::{CrmDirectory, CrmSnapshot, Customer, Order};
pub use domain::summary::{GenerationMethod, Summary, SummaryState};
pub use domain::thread::{Message, Thread, ThreadId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use export::{
    ApprovedSummaryRecord, CrmNoteRecord, ExportError, ExportSink, InMemoryExportSink,
    JsonlExportLog,
};
