//! Batch import of JSON record arrays into a content collection.

mod service;
pub mod types;

pub use service::{ImportApi, ImportProgress, ImportService, NoProgress, TracingProgress};
pub use types::{
    ImportError, ImportErrorKind, ImportItemResult, ImportReport, ImportRequest, ItemStatus,
    UploadedFile,
};
