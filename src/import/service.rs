//! Batch import engine: validates an uploaded batch and creates its records one by one.

use crate::content::store::ContentStore;
use crate::content::types::DocumentId;
use crate::import::types::{
    ImportError, ImportItemResult, ImportReport, ImportRequest, UploadedFile,
};
use crate::metrics::{CatalogMetrics, MetricsSnapshot};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Receives progress notifications while a batch runs.
///
/// `on_busy_changed(true)` fires before the first record, `on_progress_update` after each
/// record and `on_busy_changed(false)` once the loop has finished.
pub trait ImportProgress: Send + Sync {
    /// Percentage of records processed so far.
    fn on_progress_update(&self, _percent: u8) {}

    /// The import loop started or stopped.
    fn on_busy_changed(&self, _busy: bool) {}
}

/// Ignores every notification.
pub struct NoProgress;

impl ImportProgress for NoProgress {}

/// Emits progress as debug-level tracing events.
pub struct TracingProgress {
    collection: String,
}

impl TracingProgress {
    /// Progress reporter labelled with the target collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

impl ImportProgress for TracingProgress {
    fn on_progress_update(&self, percent: u8) {
        tracing::debug!(collection = %self.collection, percent, "Import progress");
    }

    fn on_busy_changed(&self, busy: bool) {
        tracing::debug!(collection = %self.collection, busy, "Import busy state changed");
    }
}

/// Abstraction over the import engine used by the HTTP surface.
#[async_trait]
pub trait ImportApi: Send + Sync {
    /// Run one import request to completion.
    async fn import(
        &self,
        request: ImportRequest,
        progress: &dyn ImportProgress,
    ) -> Result<ImportReport, ImportError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Imports batches into a [`ContentStore`].
pub struct ImportService {
    store: Arc<dyn ContentStore>,
    metrics: Arc<CatalogMetrics>,
}

impl ImportService {
    /// Build an engine writing to `store`.
    pub fn new(store: Arc<dyn ContentStore>, metrics: Arc<CatalogMetrics>) -> Self {
        Self { store, metrics }
    }

    async fn create_records(
        &self,
        collection: &str,
        records: Vec<Value>,
        request: &ImportRequest,
        progress: &dyn ImportProgress,
    ) -> Vec<ImportItemResult> {
        let total = records.len();
        let mut results = Vec::with_capacity(total);
        progress.on_busy_changed(true);
        if total == 0 {
            progress.on_progress_update(100);
        }

        for (index, record) in records.into_iter().enumerate() {
            let result = match self
                .store
                .create(collection, record, request.acting_user.as_ref())
                .await
            {
                Ok(created) => match DocumentId::from_record(&created) {
                    Some(id) => ImportItemResult::created(index, id),
                    None => {
                        tracing::warn!(collection, index, "Store returned a document without an id");
                        ImportItemResult::failed(index, "created document has no id")
                    }
                },
                Err(error) => {
                    tracing::debug!(collection, index, error = %error, "Import record rejected");
                    ImportItemResult::failed(index, error.to_string())
                }
            };
            results.push(result);
            progress.on_progress_update(percent_done(index + 1, total));
        }

        progress.on_busy_changed(false);
        results
    }
}

#[async_trait]
impl ImportApi for ImportService {
    async fn import(
        &self,
        request: ImportRequest,
        progress: &dyn ImportProgress,
    ) -> Result<ImportReport, ImportError> {
        let (file, collection) = validate_request(&request)?;
        let records = parse_batch(file)?;
        tracing::info!(
            collection,
            file = %file.name,
            records = records.len(),
            user = ?request.acting_user.as_ref().map(|user| &user.email),
            "Importing batch"
        );

        let results = self
            .create_records(collection, records, &request, progress)
            .await;
        let report = ImportReport::from_results(results);
        let (created, failed) = (report.created(), report.failed());
        self.metrics.record_batch(created as u64, failed as u64);
        tracing::info!(collection, created, failed, "Batch imported");
        Ok(report)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Steps that reject the whole request before any record is touched.
fn validate_request(request: &ImportRequest) -> Result<(&UploadedFile, &str), ImportError> {
    if !request.authorized {
        return Err(ImportError::Unauthorized);
    }
    let file = request.file.as_ref().ok_or(ImportError::MissingFile)?;
    let collection = request
        .collection
        .as_deref()
        .filter(|collection| !collection.is_empty())
        .ok_or(ImportError::MissingCollection)?;
    if !has_json_extension(&file.name) {
        return Err(ImportError::UnsupportedFormat);
    }
    Ok((file, collection))
}

fn has_json_extension(file_name: &str) -> bool {
    file_name
        .rsplit('.')
        .next()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

fn parse_batch(file: &UploadedFile) -> Result<Vec<Value>, ImportError> {
    match serde_json::from_slice::<Value>(&file.bytes) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(_) => Err(ImportError::NotAnArray),
        Err(_) => Err(ImportError::InvalidJson),
    }
}

fn percent_done(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total).min(100) as u8
}
