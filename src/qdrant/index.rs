//! Search index backed by a Qdrant collection.

use crate::content::types::{ContentVariant, DocumentId};
use crate::embedding::HashingEmbedder;
use crate::qdrant::client::QdrantService;
use crate::qdrant::payload::{build_payload, current_timestamp_rfc3339, point_id};
use crate::qdrant::types::{PointUpsert, QdrantError};
use crate::search::{SearchDocument, SearchIndex, SearchIndexError};
use async_trait::async_trait;
use serde_json::Value;

/// Stores one point per projection; the point id is derived from `(variant, id)`.
pub struct QdrantSearchIndex {
    service: QdrantService,
    collection: String,
    embedder: HashingEmbedder,
}

impl QdrantSearchIndex {
    /// Wrap an existing client without touching the remote collection.
    pub fn new(service: QdrantService, collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            service,
            collection: collection.into(),
            embedder: HashingEmbedder::new(dimension),
        }
    }

    /// Connect to Qdrant, creating the collection and its payload indexes when missing.
    pub async fn connect(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self, QdrantError> {
        let service = QdrantService::new(url, api_key)?;
        service
            .create_collection_if_not_exists(collection, dimension as u64)
            .await?;
        service.ensure_payload_indexes(collection).await?;
        tracing::info!(collection, dimension, "Qdrant search index ready");
        Ok(Self::new(service, collection, dimension))
    }

    /// Name of the backing collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl SearchIndex for QdrantSearchIndex {
    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchIndexError> {
        let (variant, id) = document
            .key()
            .ok_or(SearchIndexError::MissingSourceId(document.source_variant))?;
        let vector = self
            .embedder
            .embed(&document.search_content)
            .map_err(QdrantError::from)?;
        let payload = build_payload(document, &current_timestamp_rfc3339())?;
        let point = PointUpsert {
            id: point_id(variant, id),
            vector,
            payload,
        };
        self.service
            .upsert_points(&self.collection, vec![point])
            .await?;
        Ok(())
    }

    async fn remove(
        &self,
        variant: ContentVariant,
        id: &DocumentId,
    ) -> Result<(), SearchIndexError> {
        self.service
            .delete_points(&self.collection, &[point_id(variant, id)])
            .await?;
        Ok(())
    }

    async fn get(
        &self,
        variant: ContentVariant,
        id: &DocumentId,
    ) -> Result<Option<SearchDocument>, SearchIndexError> {
        let Some(payload) = self
            .service
            .retrieve_payload(&self.collection, &point_id(variant, id))
            .await?
        else {
            return Ok(None);
        };
        let document = serde_json::from_value(Value::Object(payload))?;
        Ok(Some(document))
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}
