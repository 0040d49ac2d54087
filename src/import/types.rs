//! Request, report and error types for batch imports.

use crate::content::types::{DocumentId, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File part of an upload.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Client-declared file name; only its extension is inspected.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// One import invocation, as assembled by the HTTP layer.
#[derive(Clone, Debug, Default)]
pub struct ImportRequest {
    /// Outcome of the access check performed by the caller.
    pub authorized: bool,
    /// User recorded as the creator of imported documents.
    pub acting_user: Option<User>,
    /// Uploaded batch, if any.
    pub file: Option<UploadedFile>,
    /// Target collection slug, if any.
    pub collection: Option<String>,
}

/// Per-record outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Record was created.
    Success,
    /// Record was rejected; the batch continued.
    Error,
}

/// Result for the record at `index` of the uploaded array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemResult {
    /// Zero-based position in the uploaded array.
    pub index: usize,
    /// Outcome.
    pub status: ItemStatus,
    /// Id assigned to the created document (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Why the record was rejected (error only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ImportItemResult {
    /// Successful creation of the record at `index`.
    pub fn created(index: usize, id: DocumentId) -> Self {
        Self {
            index,
            status: ItemStatus::Success,
            id: Some(id),
            error_message: None,
        }
    }

    /// Rejected record at `index`.
    pub fn failed(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            status: ItemStatus::Error,
            id: None,
            error_message: Some(message.into()),
        }
    }
}

/// Aggregate import outcome, returned whenever the batch was parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Always `true`; per-record failures do not fail the batch.
    pub success: bool,
    /// `Imported <created> items, <failed> errors`.
    pub message: String,
    /// One entry per input record, in input order.
    pub results: Vec<ImportItemResult>,
}

impl ImportReport {
    /// Summarize `results`.
    pub fn from_results(results: Vec<ImportItemResult>) -> Self {
        let created = results
            .iter()
            .filter(|result| result.status == ItemStatus::Success)
            .count();
        let failed = results.len() - created;
        Self {
            success: true,
            message: format!("Imported {created} items, {failed} errors"),
            results,
        }
    }

    /// Number of created records.
    pub fn created(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == ItemStatus::Success)
            .count()
    }

    /// Number of rejected records.
    pub fn failed(&self) -> usize {
        self.results.len() - self.created()
    }
}

/// Failure category of an [`ImportError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportErrorKind {
    /// Caller is not allowed to import.
    Unauthorized,
    /// A required part of the request is missing.
    BadRequest,
    /// The file is not a JSON file.
    UnsupportedFormat,
    /// The file is not a JSON array.
    InvalidPayload,
    /// Anything unexpected outside the per-record loop.
    InternalFailure,
}

/// Request-level import failures. Per-record failures never appear here.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Caller is not authenticated.
    #[error("Authentication required")]
    Unauthorized,
    /// No file part.
    #[error("No file provided")]
    MissingFile,
    /// No collection part.
    #[error("No collection specified")]
    MissingCollection,
    /// File extension is not `json`.
    #[error("Only JSON files are supported at this time.")]
    UnsupportedFormat,
    /// File contents are not JSON.
    #[error("Invalid JSON file.")]
    InvalidJson,
    /// File contents are JSON but not an array.
    #[error("JSON must be an array of objects.")]
    NotAnArray,
    /// Unexpected failure while reading the request.
    #[error("Import failed: {0}")]
    Internal(String),
}

impl ImportError {
    /// Failure category.
    pub const fn kind(&self) -> ImportErrorKind {
        match self {
            Self::Unauthorized => ImportErrorKind::Unauthorized,
            Self::MissingFile | Self::MissingCollection => ImportErrorKind::BadRequest,
            Self::UnsupportedFormat => ImportErrorKind::UnsupportedFormat,
            Self::InvalidJson | Self::NotAnArray => ImportErrorKind::InvalidPayload,
            Self::Internal(_) => ImportErrorKind::InternalFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_results_serialize_only_relevant_fields() {
        let ok = serde_json::to_value(ImportItemResult::created(0, DocumentId::Number(5)))
            .unwrap();
        assert_eq!(ok, json!({ "index": 0, "status": "success", "id": 5 }));

        let err = serde_json::to_value(ImportItemResult::failed(2, "bad")).unwrap();
        assert_eq!(
            err,
            json!({ "index": 2, "status": "error", "errorMessage": "bad" })
        );
    }

    #[test]
    fn report_message_counts_outcomes() {
        let report = ImportReport::from_results(vec![
            ImportItemResult::failed(0, "x"),
            ImportItemResult::failed(1, "y"),
        ]);
        assert!(report.success);
        assert_eq!(report.message, "Imported 0 items, 2 errors");
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn error_kinds_follow_taxonomy() {
        assert_eq!(ImportError::MissingFile.kind(), ImportErrorKind::BadRequest);
        assert_eq!(ImportError::NotAnArray.kind(), ImportErrorKind::InvalidPayload);
        assert_eq!(
            ImportError::UnsupportedFormat.to_string(),
            "Only JSON files are supported at this time."
        );
    }
}
