//! Content collections: typed documents, schema declarations and the store collaborator.

pub mod memory;
pub mod schema;
pub mod store;
pub mod types;

pub use memory::MemoryContentStore;
pub use schema::{CollectionSchema, ReadAccess, ValidationError, schema_for};
pub use store::{ContentStore, FindResult, LifecycleEvent, LifecycleListener, StoreError, Where};
pub use types::{
    CategoryDocument, ContentDocument, ContentVariant, DocumentId, Record, Relation, Role,
    TagDocument, User, VideoDocument,
};
