//! Typed views over stored content records.
//!
//! The store keeps records as loose JSON maps (imports accept arbitrary JSON), so every
//! conversion here is total: missing or wrongly typed fields become `None`/empty instead of
//! errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Raw stored record: a JSON object keyed by field name.
pub type Record = Map<String, Value>;

/// Searchable content variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentVariant {
    /// Documents of the `videos` collection.
    #[serde(rename = "videos")]
    Video,
    /// Documents of the `categories` collection.
    #[serde(rename = "categories")]
    Category,
    /// Documents of the `tags` collection.
    #[serde(rename = "tags")]
    Tag,
}

impl ContentVariant {
    /// Every variant, in declaration order.
    pub const ALL: [ContentVariant; 3] = [Self::Video, Self::Category, Self::Tag];

    /// Collection slug backing this variant.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Category => "categories",
            Self::Tag => "tags",
        }
    }

    /// Resolve a collection slug to its variant, if the collection holds content documents.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.slug() == slug.trim())
    }

    /// Default search priority (lower ranks first).
    pub const fn default_priority(self) -> i64 {
        match self {
            Self::Video => 10,
            Self::Category => 20,
            Self::Tag => 30,
        }
    }

    /// Name of the relationship field on videos that points at this variant.
    pub const fn video_relation_field(self) -> Option<&'static str> {
        match self {
            Self::Video => None,
            Self::Category => Some("categories"),
            Self::Tag => Some("tags"),
        }
    }
}

impl fmt::Display for ContentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Opaque document identifier. Numeric for documents created by the memory store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    /// Integer identifier.
    Number(u64),
    /// Free-form string identifier.
    Text(String),
}

impl DocumentId {
    /// Parse an identifier from a path segment, preferring the numeric form.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<u64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(trimmed.to_string()))
    }

    /// Interpret a JSON value as an identifier. Only non-negative integers and non-empty
    /// strings qualify; strings are kept verbatim.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_u64().map(Self::Number),
            Value::String(text) if !text.trim().is_empty() => Some(Self::Text(text.clone())),
            _ => None,
        }
    }

    /// Read the `id` field of a record.
    pub fn from_record(record: &Record) -> Option<Self> {
        record.get("id").and_then(Self::from_value)
    }

    /// JSON representation stored inside records.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(number) => Value::from(*number),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A relationship field entry: either a bare identifier or the populated related document.
#[derive(Clone, Debug, PartialEq)]
pub enum Relation {
    /// Unpopulated reference.
    Id(DocumentId),
    /// Related document inlined by a populated read.
    Inlined(Record),
}

impl Relation {
    /// Interpret one relationship entry. Values that are neither identifiers nor objects are
    /// not relations.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Inlined(map.clone())),
            other => DocumentId::from_value(other).map(Self::Id),
        }
    }

    /// Identifier of the related document, whichever form the entry takes.
    pub fn id(&self) -> Option<DocumentId> {
        match self {
            Self::Id(id) => Some(id.clone()),
            Self::Inlined(record) => DocumentId::from_record(record),
        }
    }
}

/// Parse a has-many relationship field. Absent or non-array values yield no relations.
pub fn relation_list(value: Option<&Value>) -> Vec<Relation> {
    value
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(Relation::from_value).collect())
        .unwrap_or_default()
}

/// A `videos` document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoDocument {
    /// Store-assigned identifier.
    pub id: Option<DocumentId>,
    /// Display title.
    pub title: Option<String>,
    /// Plain string or rich-text tree.
    pub description: Option<Value>,
    /// Direct MP4 source.
    pub mp4_url: Option<String>,
    /// Embeddable player URL.
    pub iframe_url: Option<String>,
    /// Thumbnail image URL.
    pub thumbnail_url: Option<String>,
    /// Related categories.
    pub categories: Vec<Relation>,
    /// Related tags.
    pub tags: Vec<Relation>,
}

/// A `categories` document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryDocument {
    /// Store-assigned identifier.
    pub id: Option<DocumentId>,
    /// Display name.
    pub name: Option<String>,
    /// Plain string or rich-text tree.
    pub description: Option<Value>,
    /// URL slug.
    pub slug: Option<String>,
}

/// A `tags` document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagDocument {
    /// Store-assigned identifier.
    pub id: Option<DocumentId>,
    /// Display name.
    pub name: Option<String>,
    /// Alternate display label.
    pub label: Option<String>,
    /// Plain string or rich-text tree.
    pub description: Option<Value>,
}

/// A content document of any searchable variant.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentDocument {
    /// Video variant.
    Video(VideoDocument),
    /// Category variant.
    Category(CategoryDocument),
    /// Tag variant.
    Tag(TagDocument),
}

impl ContentDocument {
    /// Build a typed document from a stored record.
    pub fn from_record(variant: ContentVariant, record: &Record) -> Self {
        let id = DocumentId::from_record(record);
        let description = record
            .get("description")
            .filter(|value| !value.is_null())
            .cloned();
        match variant {
            ContentVariant::Video => Self::Video(VideoDocument {
                id,
                title: string_field(record, &["title"]),
                description,
                mp4_url: string_field(record, &["mp4Url", "mp4url"]),
                iframe_url: string_field(record, &["iframeUrl", "iframeurl"]),
                thumbnail_url: string_field(record, &["thumbnailUrl", "thumbnailurl"]),
                categories: relation_list(record.get("categories")),
                tags: relation_list(record.get("tags")),
            }),
            ContentVariant::Category => Self::Category(CategoryDocument {
                id,
                name: string_field(record, &["name"]),
                description,
                slug: string_field(record, &["slug"]),
            }),
            ContentVariant::Tag => Self::Tag(TagDocument {
                id,
                name: string_field(record, &["name"]),
                label: string_field(record, &["label"]),
                description,
            }),
        }
    }

    /// Variant tag.
    pub fn variant(&self) -> ContentVariant {
        match self {
            Self::Video(_) => ContentVariant::Video,
            Self::Category(_) => ContentVariant::Category,
            Self::Tag(_) => ContentVariant::Tag,
        }
    }

    /// Identifier, if assigned.
    pub fn id(&self) -> Option<&DocumentId> {
        match self {
            Self::Video(doc) => doc.id.as_ref(),
            Self::Category(doc) => doc.id.as_ref(),
            Self::Tag(doc) => doc.id.as_ref(),
        }
    }

    /// Drop every relationship, used when related documents could not be resolved.
    pub fn without_relations(self) -> Self {
        match self {
            Self::Video(mut doc) => {
                doc.categories.clear();
                doc.tags.clear();
                Self::Video(doc)
            }
            other => other,
        }
    }
}

/// Roles assignable to users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrative role.
    Admin,
    /// Regular account.
    User,
}

impl Role {
    /// Wire value stored in `users.role`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(()),
        }
    }
}

/// Authenticated account resolved from the `users` collection.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Store-assigned identifier.
    pub id: DocumentId,
    /// Login email.
    pub email: String,
    /// Assigned role.
    pub role: Role,
}

impl User {
    /// Interpret a `users` record. Records without id or email are not users.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: DocumentId::from_record(record)?,
            email: string_field(record, &["email"])?,
            role: record
                .get("role")
                .and_then(Value::as_str)
                .and_then(|role| role.parse().ok())
                .unwrap_or(Role::User),
        })
    }
}

/// First string value found under any of `keys`.
pub(crate) fn string_field(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
