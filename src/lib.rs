#![deny(missing_docs)]

//! Video catalog backend: content collections, bulk JSON import and search projections.
//!
//! Documents live in a [`content::ContentStore`]. Every committed write notifies the
//! [`search::SearchSync`] controller, which rebuilds the flat [`search::SearchDocument`]
//! for searchable variants and stores it in a [`search::SearchIndex`] (in memory or Qdrant).

/// Credential checks and user authentication.
pub mod access;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Content collections, schemas and the in-memory store.
pub mod content;
/// Deterministic vectors for stored projections.
pub mod embedding;
/// Batch import engine.
pub mod import;
/// Structured logging and tracing setup.
pub mod logging;
/// Import and sync counters.
pub mod metrics;
/// Qdrant vector store integration.
pub mod qdrant;
/// Rich-text to plain-text extraction.
pub mod richtext;
/// Search projections and their synchronization.
pub mod search;
