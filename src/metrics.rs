use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing import and search sync activity.
#[derive(Default)]
pub struct CatalogMetrics {
    batches_imported: AtomicU64,
    items_created: AtomicU64,
    items_failed: AtomicU64,
    projections_written: AtomicU64,
    projections_removed: AtomicU64,
    sync_degraded: AtomicU64,
    sync_failures: AtomicU64,
}

impl CatalogMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed import batch and its per-item outcome counts.
    pub fn record_batch(&self, created: u64, failed: u64) {
        self.batches_imported.fetch_add(1, Ordering::Relaxed);
        self.items_created.fetch_add(created, Ordering::Relaxed);
        self.items_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record a projection written to the search index.
    pub fn record_projection_written(&self) {
        self.projections_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a projection removed from the search index.
    pub fn record_projection_removed(&self) {
        self.projections_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sync that proceeded without resolved relationships.
    pub fn record_sync_degraded(&self) {
        self.sync_degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sync whose index write failed.
    pub fn record_sync_failure(&self) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_imported: self.batches_imported.load(Ordering::Relaxed),
            items_created: self.items_created.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            projections_written: self.projections_written.load(Ordering::Relaxed),
            projections_removed: self.projections_removed.load(Ordering::Relaxed),
            sync_degraded: self.sync_degraded.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Import batches that passed validation and ran to completion.
    pub batches_imported: u64,
    /// Records created by imports.
    pub items_created: u64,
    /// Records rejected during imports.
    pub items_failed: u64,
    /// Projections written to the search index.
    pub projections_written: u64,
    /// Projections removed from the search index.
    pub projections_removed: u64,
    /// Syncs that ran without resolved relationships.
    pub sync_degraded: u64,
    /// Syncs whose index write or removal failed.
    pub sync_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_batches_and_items() {
        let metrics = CatalogMetrics::new();
        metrics.record_batch(4, 1);
        metrics.record_batch(0, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_imported, 2);
        assert_eq!(snapshot.items_created, 4);
        assert_eq!(snapshot.items_failed, 3);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = CatalogMetrics::new().snapshot();
        assert_eq!(snapshot.projections_written, 0);
        assert_eq!(snapshot.sync_failures, 0);
    }
}
