//! Search document shape and index-related errors.

use crate::content::types::{ContentVariant, DocumentId};
use crate::qdrant::QdrantError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference back to the source document a projection was built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Source collection.
    pub relation_to: ContentVariant,
    /// Source identifier, when the source carried one.
    pub value: Option<DocumentId>,
}

/// Flat, denormalized projection of a content document fed to the search index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    /// Source id rendered as a string; empty when the source had none.
    pub original_doc_id: String,
    /// Source variant.
    pub source_variant: ContentVariant,
    /// Source reference.
    pub source_ref: SourceRef,
    /// Display title.
    pub title: String,
    /// Plain-text description.
    pub description: String,
    /// First 150 characters of the description, with `...` when truncated.
    pub excerpt: String,
    /// Thumbnail URL (videos only).
    pub thumbnail_url: Option<String>,
    /// Names of inlined categories, in relationship order.
    #[serde(default)]
    pub category_names: Vec<String>,
    /// Labels (or names) of inlined tags, in relationship order.
    #[serde(default)]
    pub tag_names: Vec<String>,
    /// Whitespace-normalized concatenation of the searchable text.
    pub search_content: String,
    /// Search priority (lower ranks first).
    pub priority: i64,
    /// Category slug (categories only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
}

impl SearchDocument {
    /// Index key of this projection, if the source had an id.
    pub fn key(&self) -> Option<(ContentVariant, &DocumentId)> {
        self.source_ref
            .value
            .as_ref()
            .map(|id| (self.source_ref.relation_to, id))
    }
}

/// Errors raised by search index backends.
#[derive(Debug, Error)]
pub enum SearchIndexError {
    /// Projection cannot be stored without a source id.
    #[error("Search document for {0} has no source id")]
    MissingSourceId(ContentVariant),
    /// Qdrant rejected or failed the request.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// A stored payload could not be decoded into a search document.
    #[error("Failed to decode stored search document: {0}")]
    Decode(#[from] serde_json::Error),
    /// In-memory index lock was poisoned.
    #[error("Search index unavailable")]
    Unavailable,
}

/// What a sync pass did for one source document.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    /// A new projection was written.
    Projected(SearchDocument),
    /// The computed projection matched the stored one; nothing was written.
    Unchanged,
    /// The projection was removed.
    Removed,
    /// The variant is not searchable or the source has no id.
    Skipped,
    /// The index rejected the write; the triggering change still succeeded.
    Failed(String),
}
