//! Search sync controller.
//!
//! Subscribes to content store lifecycle events and keeps exactly one projection per
//! searchable source document in the search index:
//!
//! - create/update of a searchable document rebuilds its projection from a populated read;
//! - delete removes it;
//! - update/delete of a category or tag re-projects every video referencing it.
//!
//! Indexing problems are logged and counted but never surface to the store write that
//! triggered them.

use crate::content::store::{ContentStore, LifecycleEvent, LifecycleListener, Where};
use crate::content::types::{ContentDocument, ContentVariant, DocumentId, Record};
use crate::metrics::CatalogMetrics;
use crate::search::index::SearchIndex;
use crate::search::projection::{SearchPriorities, build_projection};
use crate::search::types::SyncOutcome;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Relationship depth used when reading a source for projection.
const POPULATE_DEPTH: u8 = 1;

/// Which variants are indexed and at what default priority.
#[derive(Clone, Debug)]
pub struct SearchSettings {
    /// Variants that get projections.
    pub searchable: BTreeSet<ContentVariant>,
    /// Default priorities for fresh projections.
    pub priorities: SearchPriorities,
}

impl SearchSettings {
    /// Settings indexing the given variants with default priorities.
    pub fn new(searchable: impl IntoIterator<Item = ContentVariant>) -> Self {
        Self {
            searchable: searchable.into_iter().collect(),
            priorities: SearchPriorities::default(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::new(ContentVariant::ALL)
    }
}

/// Keeps the search index consistent with the content store.
pub struct SearchSync {
    index: Arc<dyn SearchIndex>,
    settings: SearchSettings,
    metrics: Arc<CatalogMetrics>,
}

impl SearchSync {
    /// Build a controller writing to `index`.
    pub fn new(
        index: Arc<dyn SearchIndex>,
        settings: SearchSettings,
        metrics: Arc<CatalogMetrics>,
    ) -> Self {
        Self {
            index,
            settings,
            metrics,
        }
    }

    /// Whether projections are maintained for `variant`.
    pub fn is_searchable(&self, variant: ContentVariant) -> bool {
        self.settings.searchable.contains(&variant)
    }

    /// Rebuild and store the projection of one source document.
    ///
    /// `record` is the document as carried by the triggering event. The source is re-read
    /// with relationships populated; when that read fails the projection is built from
    /// `record` with its relationships treated as empty.
    pub async fn sync_document(
        &self,
        store: &dyn ContentStore,
        variant: ContentVariant,
        record: &Record,
    ) -> SyncOutcome {
        if !self.is_searchable(variant) {
            return SyncOutcome::Skipped;
        }
        let Some(id) = DocumentId::from_record(record) else {
            tracing::warn!(collection = %variant, "Source document has no id; skipping sync");
            return SyncOutcome::Skipped;
        };

        let document = match store.find_by_id(variant.slug(), &id, POPULATE_DEPTH).await {
            Ok(populated) => ContentDocument::from_record(variant, &populated),
            Err(error) => {
                self.metrics.record_sync_degraded();
                tracing::warn!(
                    collection = %variant,
                    %id,
                    error = %error,
                    "Relationship resolution failed; projecting without relations"
                );
                ContentDocument::from_record(variant, record).without_relations()
            }
        };

        let previous = match self.index.get(variant, &id).await {
            Ok(previous) => previous,
            Err(error) => {
                tracing::warn!(
                    collection = %variant,
                    %id,
                    error = %error,
                    "Failed to load existing projection; rebuilding without template"
                );
                None
            }
        };

        let projection = build_projection(&document, previous.as_ref(), &self.settings.priorities);
        if previous.as_ref() == Some(&projection) {
            tracing::debug!(collection = %variant, %id, "Projection unchanged");
            return SyncOutcome::Unchanged;
        }

        match self.index.upsert(&projection).await {
            Ok(()) => {
                self.metrics.record_projection_written();
                tracing::debug!(
                    collection = %variant,
                    %id,
                    categories = projection.category_names.len(),
                    tags = projection.tag_names.len(),
                    "Projection written"
                );
                SyncOutcome::Projected(projection)
            }
            Err(error) => {
                self.metrics.record_sync_failure();
                tracing::error!(collection = %variant, %id, error = %error, "Failed to write projection");
                SyncOutcome::Failed(error.to_string())
            }
        }
    }

    /// Remove the projection of a deleted source document.
    pub async fn remove_document(&self, variant: ContentVariant, id: &DocumentId) -> SyncOutcome {
        if !self.is_searchable(variant) {
            return SyncOutcome::Skipped;
        }
        match self.index.remove(variant, id).await {
            Ok(()) => {
                self.metrics.record_projection_removed();
                tracing::debug!(collection = %variant, %id, "Projection removed");
                SyncOutcome::Removed
            }
            Err(error) => {
                self.metrics.record_sync_failure();
                tracing::error!(collection = %variant, %id, error = %error, "Failed to remove projection");
                SyncOutcome::Failed(error.to_string())
            }
        }
    }

    /// Re-project every video referencing the changed category or tag.
    pub async fn refresh_referencing_videos(
        &self,
        store: &dyn ContentStore,
        variant: ContentVariant,
        id: &DocumentId,
    ) -> Vec<SyncOutcome> {
        let Some(field) = variant.video_relation_field() else {
            return Vec::new();
        };
        if !self.is_searchable(ContentVariant::Video) {
            return Vec::new();
        }
        let filter = Where::Contains {
            field: field.to_string(),
            id: id.clone(),
        };
        let videos = match store.find(ContentVariant::Video.slug(), &filter, 0).await {
            Ok(found) => found.docs,
            Err(error) => {
                self.metrics.record_sync_degraded();
                tracing::warn!(
                    collection = %variant,
                    %id,
                    error = %error,
                    "Failed to look up referencing videos"
                );
                return Vec::new();
            }
        };
        tracing::debug!(collection = %variant, %id, videos = videos.len(), "Refreshing referencing videos");

        let mut outcomes = Vec::with_capacity(videos.len());
        for video in &videos {
            outcomes.push(self.sync_document(store, ContentVariant::Video, video).await);
        }
        outcomes
    }

    /// Re-sync every document of every searchable collection.
    pub async fn reindex_all(&self, store: &dyn ContentStore) -> ReindexSummary {
        let mut summary = ReindexSummary::default();
        for variant in self.settings.searchable.iter().copied() {
            let docs = match store.find(variant.slug(), &Where::All, 0).await {
                Ok(found) => found.docs,
                Err(error) => {
                    tracing::error!(collection = %variant, error = %error, "Failed to list collection for reindex");
                    summary.failed += 1;
                    continue;
                }
            };
            for doc in &docs {
                match self.sync_document(store, variant, doc).await {
                    SyncOutcome::Projected(_) => summary.projected += 1,
                    SyncOutcome::Unchanged => summary.unchanged += 1,
                    SyncOutcome::Failed(_) => summary.failed += 1,
                    SyncOutcome::Removed | SyncOutcome::Skipped => {}
                }
            }
        }
        tracing::info!(
            projected = summary.projected,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Reindex complete"
        );
        summary
    }
}

/// Counts produced by [`SearchSync::reindex_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReindexSummary {
    /// Projections written.
    pub projected: usize,
    /// Projections already up to date.
    pub unchanged: usize,
    /// Collections or documents that could not be indexed.
    pub failed: usize,
}

#[async_trait]
impl LifecycleListener for SearchSync {
    async fn on_event(&self, store: &dyn ContentStore, event: &LifecycleEvent) {
        let Some(variant) = ContentVariant::from_slug(event.collection()) else {
            return;
        };
        match event {
            LifecycleEvent::Created { doc, .. } | LifecycleEvent::Updated { doc, .. } => {
                self.sync_document(store, variant, doc).await;
            }
            LifecycleEvent::Deleted { doc, .. } => {
                if let Some(id) = DocumentId::from_record(doc) {
                    self.remove_document(variant, &id).await;
                }
            }
        }

        if matches!(
            event,
            LifecycleEvent::Updated { .. } | LifecycleEvent::Deleted { .. }
        ) && let Some(id) = DocumentId::from_record(event.doc())
        {
            self.refresh_referencing_videos(store, variant, &id).await;
        }
    }
}
