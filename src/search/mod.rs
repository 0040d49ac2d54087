//! Search projections: builder, sync controller and index backends.

pub mod index;
pub mod projection;
pub mod sync;
pub mod types;

pub use index::{MemorySearchIndex, SearchIndex};
pub use projection::{EXCERPT_LENGTH, SearchPriorities, build_projection, excerpt, search_content};
pub use sync::{ReindexSummary, SearchSettings, SearchSync};
pub use types::{SearchDocument, SearchIndexError, SourceRef, SyncOutcome};
