//! Append-only JSON-lines export logs.
//!
//! One serialized JSON object per line, flushed on every append; prior lines
//! are never rewritten. Truncation is reserved for the admin reset path.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not open export log `{path}`: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("could not append to export log `{path}`: {source}")]
    Append { path: PathBuf, source: std::io::Error },
    #[error("could not serialize export record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Canonical record appended to the approved-summaries log on approval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovedSummaryRecord {
    pub thread_id: String,
    pub subject: String,
    pub topic: String,
    pub order_id: String,
    pub product: String,
    pub approved_summary: String,
    pub approved_fields: Value,
    pub approver: String,
    pub approved_at: DateTime<Utc>,
}

/// Record appended to the CRM-notes log by the simulated CRM post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrmNoteRecord {
    pub thread_id: String,
    pub note: String,
    pub metadata: Value,
}

pub trait ExportSink: Send + Sync {
    fn append(&self, record: Value) -> Result<(), ExportError>;
    fn truncate(&self) -> Result<(), ExportError>;
}

/// File-backed sink. Opens in append mode per write and flushes before
/// returning, so a record is either fully on disk or not written at all.
pub struct JsonlExportLog {
    path: PathBuf,
    // Serializes appends within the process; the core runs single-process.
    guard: Mutex<()>,
}

impl JsonlExportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExportSink for JsonlExportLog {
    fn append(&self, record: Value) -> Result<(), ExportError> {
        let line = serde_json::to_string(&record)?;

        let _guard = match self.guard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ExportError::Open { path: self.path.clone(), source })?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.flush())
            .map_err(|source| ExportError::Append { path: self.path.clone(), source })?;
        Ok(())
    }

    fn truncate(&self) -> Result<(), ExportError> {
        let _guard = match self.guard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        File::create(&self.path)
            .map_err(|source| ExportError::Open { path: self.path.clone(), source })?;
        Ok(())
    }
}

/// Test double that records appended values in memory.
#[derive(Clone, Default)]
pub struct InMemoryExportSink {
    records: Arc<Mutex<Vec<Value>>>,
}

impl InMemoryExportSink {
    pub fn records(&self) -> Vec<Value> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ExportSink for InMemoryExportSink {
    fn append(&self, record: Value) -> Result<(), ExportError> {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }

    fn truncate(&self) -> Result<(), ExportError> {
        match self.records.lock() {
            Ok(mut records) => records.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        Ok(())
    }
}
