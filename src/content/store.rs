//! Content store collaborator interface and lifecycle notifications.

use crate::content::schema::{HookRejection, ValidationError};
use crate::content::types::{DocumentId, Record, User};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by content store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Target collection is not configured.
    #[error("Collection not found: {0}")]
    UnknownCollection(String),
    /// No document with the given id exists in the collection.
    #[error("Document {id} not found in {collection}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Missing identifier.
        id: DocumentId,
    },
    /// Input must be a JSON object.
    #[error("Record must be a JSON object")]
    NotAnObject,
    /// Field validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A collection hook rejected the change.
    #[error(transparent)]
    Rejected(#[from] HookRejection),
    /// Backing storage could not serve the request.
    #[error("Content store unavailable: {0}")]
    Unavailable(String),
}

/// Query filter accepted by [`ContentStore::find`].
#[derive(Clone, Debug, PartialEq)]
pub enum Where {
    /// Every document.
    All,
    /// Field equals value.
    Equals {
        /// Field name.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// Relationship field references the given id.
    Contains {
        /// Relationship field name.
        field: String,
        /// Referenced identifier.
        id: DocumentId,
    },
}

impl Where {
    /// Evaluate the filter against a stored (unpopulated) record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Equals { field, value } => record.get(field) == Some(value),
            Self::Contains { field, id } => record
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|entries| {
                    entries
                        .iter()
                        .filter_map(DocumentId::from_value)
                        .any(|entry| entry.to_string() == id.to_string())
                }),
        }
    }
}

/// Result of [`ContentStore::find`].
#[derive(Clone, Debug, Default)]
pub struct FindResult {
    /// Matching documents, ordered by id.
    pub docs: Vec<Record>,
}

/// Change notification emitted after a write has been committed.
#[derive(Clone, Debug)]
pub enum LifecycleEvent {
    /// A document was created.
    Created {
        /// Collection slug.
        collection: String,
        /// Stored document.
        doc: Record,
    },
    /// A document was updated.
    Updated {
        /// Collection slug.
        collection: String,
        /// Stored document after the update.
        doc: Record,
        /// Stored document before the update.
        previous: Record,
    },
    /// A document was deleted.
    Deleted {
        /// Collection slug.
        collection: String,
        /// Document as it was before deletion.
        doc: Record,
    },
}

impl LifecycleEvent {
    /// Collection the event belongs to.
    pub fn collection(&self) -> &str {
        match self {
            Self::Created { collection, .. }
            | Self::Updated { collection, .. }
            | Self::Deleted { collection, .. } => collection,
        }
    }

    /// Document carried by the event.
    pub fn doc(&self) -> &Record {
        match self {
            Self::Created { doc, .. } | Self::Updated { doc, .. } | Self::Deleted { doc, .. } => {
                doc
            }
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "afterCreate",
            Self::Updated { .. } => "afterUpdate",
            Self::Deleted { .. } => "afterDelete",
        }
    }
}

/// Subscriber to store lifecycle notifications.
///
/// Listeners run inline with the triggering write and receive the store so they can issue
/// follow-up reads. They cannot fail the write: any error must be handled internally.
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    /// Handle a committed change.
    async fn on_event(&self, store: &dyn ContentStore, event: &LifecycleEvent);
}

/// CRUD interface over the configured collections.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Validate and persist a new document, returning it with its assigned id.
    async fn create(
        &self,
        collection: &str,
        data: Value,
        acting_user: Option<&User>,
    ) -> Result<Record, StoreError>;

    /// Apply a partial update to an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: Value,
        acting_user: Option<&User>,
    ) -> Result<Record, StoreError>;

    /// Delete a document, returning its last stored state.
    async fn delete(
        &self,
        collection: &str,
        id: &DocumentId,
        acting_user: Option<&User>,
    ) -> Result<Record, StoreError>;

    /// Read one document. `depth > 0` inlines related documents.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        depth: u8,
    ) -> Result<Record, StoreError>;

    /// Read every document matching `filter`.
    async fn find(&self, collection: &str, filter: &Where, depth: u8)
    -> Result<FindResult, StoreError>;

    /// Register a listener for lifecycle notifications.
    fn subscribe(&self, listener: Arc<dyn LifecycleListener>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contains_matches_numeric_and_string_ids() {
        let record = json!({ "categories": [1, "2"] }).as_object().cloned().unwrap();
        let filter = |id| Where::Contains {
            field: "categories".into(),
            id,
        };
        assert!(filter(DocumentId::Number(1)).matches(&record));
        assert!(filter(DocumentId::Number(2)).matches(&record));
        assert!(!filter(DocumentId::Number(3)).matches(&record));
        assert!(Where::All.matches(&record));
    }

    #[test]
    fn equals_compares_raw_values() {
        let record = json!({ "apiKey": "k1" }).as_object().cloned().unwrap();
        let filter = Where::Equals {
            field: "apiKey".into(),
            value: json!("k1"),
        };
        assert!(filter.matches(&record));
        assert!(!Where::Equals {
            field: "apiKey".into(),
            value: json!("k2"),
        }
        .matches(&record));
    }
}
