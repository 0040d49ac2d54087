//! Shared types used by the Qdrant client and index adapter.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Search vector could not be produced for a document.
    #[error("Failed to encode search vector: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),
}

/// Point ready for upsert.
#[derive(Debug, Clone)]
pub struct PointUpsert {
    /// Point identifier (UUID string).
    pub id: String,
    /// Dense vector.
    pub vector: Vec<f32>,
    /// Payload object.
    pub payload: Value,
}

#[derive(Deserialize)]
pub(crate) struct RetrieveResponse {
    pub(crate) result: Option<RetrievedPoint>,
}

#[derive(Deserialize)]
pub(crate) struct RetrievedPoint {
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
