//! Qdrant vector store integration.

pub mod client;
pub mod index;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use index::QdrantSearchIndex;
pub use payload::point_id;
pub use types::{PointUpsert, QdrantError};
