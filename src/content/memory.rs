//! In-memory [`ContentStore`] implementation.
//!
//! Documents live in per-collection `BTreeMap`s behind a `std::sync::RwLock`. Guards are
//! always released before listeners run, so listeners are free to read back from the store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;

use crate::content::schema::{CollectionSchema, ValidationError, schema_for};
use crate::content::store::{
    ContentStore, FindResult, LifecycleEvent, LifecycleListener, StoreError, Where,
};
use crate::content::types::{DocumentId, Record, User};

#[derive(Default)]
struct CollectionData {
    next_id: u64,
    docs: BTreeMap<DocumentId, Record>,
}

/// In-process content store with schema validation, relationship population and lifecycle
/// notifications.
pub struct MemoryContentStore {
    collections: RwLock<HashMap<&'static str, CollectionData>>,
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
}

impl MemoryContentStore {
    /// Create an empty store holding every configured collection.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<&'static str, CollectionData>>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("collection lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<&'static str, CollectionData>>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("collection lock poisoned".to_string()))
    }

    async fn notify(&self, event: LifecycleEvent) {
        let listeners: Vec<_> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                tracing::error!("Listener registry poisoned; skipping lifecycle notification");
                return;
            }
        };
        tracing::debug!(
            collection = event.collection(),
            hook = event.kind(),
            listeners = listeners.len(),
            "Dispatching lifecycle event"
        );
        for listener in listeners {
            listener.on_event(self, &event).await;
        }
    }

    /// Check relationship targets and unique constraints against current contents.
    ///
    /// Only relationship ids introduced by this write are checked; ids carried over from
    /// `previous` may point at documents deleted since.
    fn check_references(
        &self,
        schema: &CollectionSchema,
        record: &Record,
        own_id: Option<&DocumentId>,
        previous: Option<&Record>,
    ) -> Result<(), StoreError> {
        let collections = self.read()?;
        let mut invalid = Vec::new();

        for (field, target) in schema.relationship_fields() {
            let Some(value) = record.get(field) else {
                continue;
            };
            let existing = previous
                .and_then(|previous| previous.get(field))
                .map(relation_ids)
                .unwrap_or_default();
            let target_docs = collections.get(target);
            let all_present = relation_ids(value)
                .iter()
                .filter(|id| !existing.contains(id))
                .all(|id| target_docs.is_some_and(|data| data.docs.contains_key(id)));
            if !all_present {
                invalid.push(field.to_string());
            }
        }

        if let Some(data) = collections.get(schema.slug) {
            for field in schema.unique_fields() {
                let Some(value) = record.get(field) else {
                    continue;
                };
                let taken = data
                    .docs
                    .iter()
                    .any(|(id, doc)| Some(id) != own_id && doc.get(field) == Some(value));
                if taken {
                    invalid.push(field.to_string());
                }
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields: invalid }.into())
        }
    }

    /// Replace relationship ids with the related documents where they exist.
    fn populate(
        collections: &HashMap<&'static str, CollectionData>,
        schema: &CollectionSchema,
        mut record: Record,
    ) -> Record {
        for (field, target) in schema.relationship_fields() {
            let Some(value) = record.get_mut(field) else {
                continue;
            };
            let resolve = |entry: &Value| {
                DocumentId::from_value(entry)
                    .and_then(|id| collections.get(target)?.docs.get(&id).cloned())
                    .map(Value::Object)
                    .unwrap_or_else(|| entry.clone())
            };
            let resolved = match &*value {
                Value::Array(entries) => Value::Array(entries.iter().map(resolve).collect()),
                other => resolve(other),
            };
            *value = resolved;
        }
        record
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn schema(collection: &str) -> Result<&'static CollectionSchema, StoreError> {
    schema_for(collection).ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
}

fn into_record(data: Value) -> Result<Record, StoreError> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn relation_ids(value: &Value) -> Vec<DocumentId> {
    match value {
        Value::Array(entries) => entries.iter().filter_map(DocumentId::from_value).collect(),
        other => DocumentId::from_value(other).into_iter().collect(),
    }
}

fn acting_email(user: Option<&User>) -> &str {
    user.map(|user| user.email.as_str()).unwrap_or("anonymous")
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create(
        &self,
        collection: &str,
        data: Value,
        acting_user: Option<&User>,
    ) -> Result<Record, StoreError> {
        let schema = schema(collection)?;
        let input = into_record(data)?;
        let mut record = schema.sanitize(&input, None)?;
        schema.before_change(&record, None)?;
        self.check_references(schema, &record, None, None)?;

        let created = {
            let mut collections = self.write()?;
            let data = collections.entry(schema.slug).or_default();
            data.next_id += 1;
            let id = DocumentId::Number(data.next_id);
            let now = now_rfc3339();
            record.insert("id".into(), id.to_value());
            record.insert("createdAt".into(), Value::String(now.clone()));
            record.insert("updatedAt".into(), Value::String(now));
            data.docs.insert(id, record.clone());
            record
        };

        tracing::debug!(
            collection = schema.slug,
            id = ?created.get("id"),
            title = ?schema.title_of(&created),
            acting_user = acting_email(acting_user),
            "Document created"
        );
        self.notify(LifecycleEvent::Created {
            collection: schema.slug.to_string(),
            doc: created.clone(),
        })
        .await;
        Ok(created)
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: Value,
        acting_user: Option<&User>,
    ) -> Result<Record, StoreError> {
        let schema = schema(collection)?;
        let input = into_record(patch)?;
        let previous = self.find_by_id(schema.slug, id, 0).await?;
        let mut record = schema.sanitize(&input, Some(&previous))?;
        schema.before_change(&record, Some(&previous))?;
        self.check_references(schema, &record, Some(id), Some(&previous))?;

        let updated = {
            let mut collections = self.write()?;
            let data = collections.entry(schema.slug).or_default();
            if !data.docs.contains_key(id) {
                return Err(StoreError::NotFound {
                    collection: schema.slug.to_string(),
                    id: id.clone(),
                });
            }
            record.insert("id".into(), id.to_value());
            if let Some(created_at) = previous.get("createdAt") {
                record.insert("createdAt".into(), created_at.clone());
            }
            record.insert("updatedAt".into(), Value::String(now_rfc3339()));
            data.docs.insert(id.clone(), record.clone());
            record
        };

        tracing::debug!(
            collection = schema.slug,
            %id,
            acting_user = acting_email(acting_user),
            "Document updated"
        );
        self.notify(LifecycleEvent::Updated {
            collection: schema.slug.to_string(),
            doc: updated.clone(),
            previous,
        })
        .await;
        Ok(updated)
    }

    async fn delete(
        &self,
        collection: &str,
        id: &DocumentId,
        acting_user: Option<&User>,
    ) -> Result<Record, StoreError> {
        let schema = schema(collection)?;
        let removed = {
            let mut collections = self.write()?;
            collections
                .get_mut(schema.slug)
                .and_then(|data| data.docs.remove(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: schema.slug.to_string(),
                    id: id.clone(),
                })?
        };

        tracing::debug!(
            collection = schema.slug,
            %id,
            acting_user = acting_email(acting_user),
            "Document deleted"
        );
        self.notify(LifecycleEvent::Deleted {
            collection: schema.slug.to_string(),
            doc: removed.clone(),
        })
        .await;
        Ok(removed)
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        depth: u8,
    ) -> Result<Record, StoreError> {
        let schema = schema(collection)?;
        let collections = self.read()?;
        let record = collections
            .get(schema.slug)
            .and_then(|data| data.docs.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: schema.slug.to_string(),
                id: id.clone(),
            })?;
        Ok(if depth > 0 {
            Self::populate(&collections, schema, record)
        } else {
            record
        })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Where,
        depth: u8,
    ) -> Result<FindResult, StoreError> {
        let schema = schema(collection)?;
        let collections = self.read()?;
        let docs = collections
            .get(schema.slug)
            .map(|data| {
                data.docs
                    .values()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .map(|record| {
                        if depth > 0 {
                            Self::populate(&collections, schema, record)
                        } else {
                            record
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(FindResult { docs })
    }

    fn subscribe(&self, listener: Arc<dyn LifecycleListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => tracing::error!("Listener registry poisoned; subscription dropped"),
        }
    }
}
