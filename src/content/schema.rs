//! Collection declarations and record validation.
//!
//! Each collection declares its fields once; the store uses the declaration to sanitize
//! incoming data (unknown fields dropped, defaults applied, types checked, required fields
//! enforced) before anything is persisted.

use crate::content::types::{DocumentId, Record, Role};
use crate::richtext::is_rich_text;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Field value categories understood by the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line string.
    Text,
    /// Long-form string or rich-text tree.
    Textarea,
    /// String containing an `@`.
    Email,
    /// One of a fixed set of strings.
    Select(&'static [&'static str]),
    /// Reference(s) into another collection.
    Relationship {
        /// Target collection slug.
        relation_to: &'static str,
        /// Whether the field holds a list of references.
        has_many: bool,
    },
}

/// Declaration of one collection field.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    /// Canonical field name.
    pub name: &'static str,
    /// Accepted alternate spellings on input.
    pub aliases: &'static [&'static str],
    /// Value category.
    pub kind: FieldKind,
    /// Whether a non-empty value must be present.
    pub required: bool,
    /// Value applied on create when the field is absent.
    pub default: Option<&'static str>,
    /// Value must be unique within the collection.
    pub unique: bool,
    /// Never returned by read endpoints.
    pub hidden: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            aliases: &[],
            kind,
            required: false,
            default: None,
            unique: false,
            hidden: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Who may read a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadAccess {
    /// Anyone.
    Public,
    /// Callers presenting the shared API key, or admins.
    ApiKeyOrAdmin,
}

/// Declaration of a collection.
#[derive(Debug)]
pub struct CollectionSchema {
    /// Collection slug used in URLs and store calls.
    pub slug: &'static str,
    /// Field used as the document's display title.
    pub use_as_title: &'static str,
    /// Read access rule.
    pub read_access: ReadAccess,
    /// Declared fields.
    pub fields: &'static [FieldSpec],
}

const ROLE_OPTIONS: &[&str] = &["user", "admin"];

/// `videos` collection.
pub static VIDEOS: CollectionSchema = CollectionSchema {
    slug: "videos",
    use_as_title: "title",
    read_access: ReadAccess::Public,
    fields: &[
        FieldSpec::new("title", FieldKind::Text).required(),
        FieldSpec::new("description", FieldKind::Textarea),
        FieldSpec::new("mp4Url", FieldKind::Text).aliases(&["mp4url"]),
        FieldSpec::new("iframeUrl", FieldKind::Text).aliases(&["iframeurl"]),
        FieldSpec::new("thumbnailUrl", FieldKind::Text).aliases(&["thumbnailurl"]),
        FieldSpec::new(
            "categories",
            FieldKind::Relationship {
                relation_to: "categories",
                has_many: true,
            },
        ),
        FieldSpec::new(
            "tags",
            FieldKind::Relationship {
                relation_to: "tags",
                has_many: true,
            },
        ),
    ],
};

/// `categories` collection.
pub static CATEGORIES: CollectionSchema = CollectionSchema {
    slug: "categories",
    use_as_title: "name",
    read_access: ReadAccess::Public,
    fields: &[
        FieldSpec::new("name", FieldKind::Text).required(),
        FieldSpec::new("description", FieldKind::Textarea),
        FieldSpec::new("slug", FieldKind::Text),
    ],
};

/// `tags` collection.
pub static TAGS: CollectionSchema = CollectionSchema {
    slug: "tags",
    use_as_title: "name",
    read_access: ReadAccess::ApiKeyOrAdmin,
    fields: &[
        FieldSpec::new("name", FieldKind::Text).required(),
        FieldSpec::new("label", FieldKind::Text),
        FieldSpec::new("description", FieldKind::Textarea),
    ],
};

/// `users` collection.
pub static USERS: CollectionSchema = CollectionSchema {
    slug: "users",
    use_as_title: "email",
    read_access: ReadAccess::ApiKeyOrAdmin,
    fields: &[
        FieldSpec::new("email", FieldKind::Email).required().unique(),
        FieldSpec::new("role", FieldKind::Select(ROLE_OPTIONS))
            .required()
            .default_value("user"),
        FieldSpec::new("apiKey", FieldKind::Text).unique().hidden(),
    ],
};

/// `media` collection. Upload storage lives outside this service; only metadata is kept.
pub static MEDIA: CollectionSchema = CollectionSchema {
    slug: "media",
    use_as_title: "filename",
    read_access: ReadAccess::ApiKeyOrAdmin,
    fields: &[
        FieldSpec::new("alt", FieldKind::Text).required(),
        FieldSpec::new("filename", FieldKind::Text),
        FieldSpec::new("mimeType", FieldKind::Text),
        FieldSpec::new("url", FieldKind::Text),
    ],
};

/// Every configured collection.
pub static COLLECTIONS: [&CollectionSchema; 5] = [&USERS, &MEDIA, &VIDEOS, &CATEGORIES, &TAGS];

/// Look up a collection by slug.
pub fn schema_for(slug: &str) -> Option<&'static CollectionSchema> {
    COLLECTIONS
        .iter()
        .copied()
        .find(|schema| schema.slug == slug.trim())
}

/// One or more fields failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    /// Offending field names, in declaration order.
    pub fields: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fields.as_slice() {
            [single] => write!(f, "The following field is invalid: {single}"),
            many => write!(f, "The following fields are invalid: {}", many.join(", ")),
        }
    }
}

/// Error raised by a collection's before-change hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookRejection(pub String);

impl CollectionSchema {
    /// Fields holding relationships, with their target collections.
    pub fn relationship_fields(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.fields.iter().filter_map(|field| match field.kind {
            FieldKind::Relationship { relation_to, .. } => Some((field.name, relation_to)),
            _ => None,
        })
    }

    /// Fields that must hold unique values.
    pub fn unique_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|field| field.unique)
            .map(|field| field.name)
    }

    /// Sanitize `input` against the declaration.
    ///
    /// With `previous` set (an update), absent fields keep their stored values; otherwise
    /// defaults are applied. Unknown fields are dropped and relationship entries are
    /// normalized to bare identifiers. Referential checks are left to the store.
    pub fn sanitize(&self, input: &Record, previous: Option<&Record>) -> Result<Record, ValidationError> {
        let mut output = Record::new();
        let mut invalid = Vec::new();

        for field in self.fields {
            let supplied = std::iter::once(field.name)
                .chain(field.aliases.iter().copied())
                .find_map(|key| input.get(key));

            let value = match supplied {
                Some(value) => match normalize(field.kind, value) {
                    Some(normalized) => normalized,
                    None => {
                        invalid.push(field.name.to_string());
                        continue;
                    }
                },
                None => match previous.and_then(|prev| prev.get(field.name)) {
                    Some(existing) => existing.clone(),
                    None => match field.default {
                        Some(default) if previous.is_none() => Value::String(default.to_string()),
                        _ => Value::Null,
                    },
                },
            };

            if field.required && is_blank(&value) {
                invalid.push(field.name.to_string());
                continue;
            }
            if !value.is_null() {
                output.insert(field.name.to_string(), value);
            }
        }

        if invalid.is_empty() {
            Ok(output)
        } else {
            Err(ValidationError { fields: invalid })
        }
    }

    /// Display title of a stored record.
    pub fn title_of(&self, record: &Record) -> Option<String> {
        record
            .get(self.use_as_title)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Remove hidden fields before a record leaves the service.
    pub fn redact(&self, mut record: Record) -> Record {
        for field in self.fields.iter().filter(|field| field.hidden) {
            record.remove(field.name);
        }
        record
    }

    /// Collection-specific before-change rules.
    pub fn before_change(&self, data: &Record, previous: Option<&Record>) -> Result<(), HookRejection> {
        if self.slug != USERS.slug {
            return Ok(());
        }
        let role_of = |record: &Record| {
            record
                .get("role")
                .and_then(Value::as_str)
                .and_then(|role| role.parse::<Role>().ok())
        };
        let was_admin = previous.and_then(role_of) == Some(Role::Admin);
        if was_admin && role_of(data) != Some(Role::Admin) {
            return Err(HookRejection(
                "You cannot change the role of an admin user.".to_string(),
            ));
        }
        Ok(())
    }
}

fn normalize(kind: FieldKind, value: &Value) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    match kind {
        FieldKind::Text => value.is_string().then(|| value.clone()),
        FieldKind::Textarea => (value.is_string() || is_rich_text(value)).then(|| value.clone()),
        FieldKind::Email => value
            .as_str()
            .map(str::trim)
            .filter(|email| email.contains('@'))
            .map(|email| Value::String(email.to_lowercase())),
        FieldKind::Select(options) => value
            .as_str()
            .filter(|candidate| options.contains(candidate))
            .map(|candidate| Value::String(candidate.to_string())),
        FieldKind::Relationship { has_many, .. } => {
            if has_many {
                let entries = value.as_array()?;
                let ids = entries
                    .iter()
                    .map(relation_id)
                    .collect::<Option<Vec<_>>>()?;
                Some(Value::Array(ids))
            } else {
                relation_id(value)
            }
        }
    }
}

/// Stored ids are numeric, so digit strings are coerced the same way path segments are.
fn relation_id(value: &Value) -> Option<Value> {
    let id = match value {
        Value::Object(map) => map.get("id").and_then(DocumentId::from_value),
        other => DocumentId::from_value(other),
    }?;
    let id = match id {
        DocumentId::Text(text) => DocumentId::parse(&text),
        numeric => numeric,
    };
    Some(id.to_value())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn lookup_by_slug() {
        assert_eq!(schema_for("videos").map(|s| s.slug), Some("videos"));
        assert!(schema_for("search").is_none());
    }

    #[test]
    fn sanitize_drops_unknown_fields_and_normalizes_relations() {
        let clean = VIDEOS
            .sanitize(
                &record(json!({
                    "title": "Intro",
                    "thumbnailurl": "https://cdn/t.png",
                    "categories": [1, { "id": 2, "name": "Jazz" }, "3"],
                    "bogus": true
                })),
                None,
            )
            .expect("valid video");
        assert_eq!(clean["title"], "Intro");
        assert_eq!(clean["thumbnailUrl"], "https://cdn/t.png");
        assert_eq!(clean["categories"], json!([1, 2, 3]));
        assert!(!clean.contains_key("bogus"));
        assert!(!clean.contains_key("thumbnailurl"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = VIDEOS
            .sanitize(&record(json!({ "description": "no title" })), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "The following field is invalid: title");

        let err = VIDEOS
            .sanitize(&record(json!({ "title": "  ", "tags": "x" })), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "The following fields are invalid: title, tags");
    }

    #[test]
    fn textarea_accepts_rich_text_only_when_recognized() {
        let rich = json!({ "root": { "children": [] } });
        assert!(CATEGORIES
            .sanitize(&record(json!({ "name": "A", "description": rich })), None)
            .is_ok());
        assert!(CATEGORIES
            .sanitize(&record(json!({ "name": "A", "description": { "foo": 1 } })), None)
            .is_err());
    }

    #[test]
    fn defaults_apply_on_create_and_previous_values_on_update() {
        let created = USERS
            .sanitize(&record(json!({ "email": "Ann@Example.com" })), None)
            .unwrap();
        assert_eq!(created["role"], "user");
        assert_eq!(created["email"], "ann@example.com");

        let previous = record(json!({ "email": "ann@example.com", "role": "admin" }));
        let updated = USERS
            .sanitize(&record(json!({ "apiKey": "k" })), Some(&previous))
            .unwrap();
        assert_eq!(updated["role"], "admin");
        assert_eq!(updated["apiKey"], "k");
    }

    #[test]
    fn select_rejects_unknown_options() {
        let err = USERS
            .sanitize(&record(json!({ "email": "a@b.c", "role": "root" })), None)
            .unwrap_err();
        assert_eq!(err.fields, vec!["role".to_string()]);
    }

    #[test]
    fn admin_role_cannot_be_downgraded() {
        let previous = record(json!({ "email": "a@b.c", "role": "admin" }));
        let demoted = record(json!({ "email": "a@b.c", "role": "user" }));
        assert!(USERS.before_change(&demoted, Some(&previous)).is_err());
        assert!(USERS.before_change(&previous, Some(&previous)).is_ok());
        assert!(USERS.before_change(&previous, None).is_ok());
        assert!(VIDEOS.before_change(&demoted, Some(&previous)).is_ok());
    }

    #[test]
    fn redact_removes_hidden_fields() {
        let redacted = USERS.redact(record(json!({ "email": "a@b.c", "apiKey": "secret" })));
        assert!(!redacted.contains_key("apiKey"));
        assert_eq!(USERS.title_of(&redacted).as_deref(), Some("a@b.c"));
    }
}
