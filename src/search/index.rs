//! Search index collaborator interface and the in-memory backend.

use crate::content::types::{ContentVariant, DocumentId};
use crate::search::types::{SearchDocument, SearchIndexError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Storage for search projections, keyed by `(variant, id)`.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the projection for its source document.
    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchIndexError>;

    /// Remove the projection for a source document. Removing a missing entry succeeds.
    async fn remove(&self, variant: ContentVariant, id: &DocumentId)
    -> Result<(), SearchIndexError>;

    /// Fetch the current projection for a source document.
    async fn get(
        &self,
        variant: ContentVariant,
        id: &DocumentId,
    ) -> Result<Option<SearchDocument>, SearchIndexError>;

    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;
}

/// Process-local search index.
#[derive(Default)]
pub struct MemorySearchIndex {
    documents: RwLock<BTreeMap<(ContentVariant, DocumentId), SearchDocument>>,
}

impl MemorySearchIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored projections.
    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    /// Whether the index holds no projections.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchIndexError> {
        let (variant, id) = document
            .key()
            .ok_or(SearchIndexError::MissingSourceId(document.source_variant))?;
        let key = (variant, id.clone());
        self.documents
            .write()
            .map_err(|_| SearchIndexError::Unavailable)?
            .insert(key, document.clone());
        Ok(())
    }

    async fn remove(
        &self,
        variant: ContentVariant,
        id: &DocumentId,
    ) -> Result<(), SearchIndexError> {
        self.documents
            .write()
            .map_err(|_| SearchIndexError::Unavailable)?
            .remove(&(variant, id.clone()));
        Ok(())
    }

    async fn get(
        &self,
        variant: ContentVariant,
        id: &DocumentId,
    ) -> Result<Option<SearchDocument>, SearchIndexError> {
        Ok(self
            .documents
            .read()
            .map_err(|_| SearchIndexError::Unavailable)?
            .get(&(variant, id.clone()))
            .cloned())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
