//! Search projection builder.
//!
//! Turns a [`ContentDocument`] into a [`SearchDocument`]. Pure and deterministic: the same
//! document and template always produce the same projection.
//!
//! Category and tag names are only taken from *inlined* relationship entries. Bare ids
//! contribute nothing; callers wanting names must read the source with relationships
//! populated.

use crate::content::types::{
    CategoryDocument, ContentDocument, ContentVariant, Record, Relation, TagDocument,
    VideoDocument,
};
use crate::richtext::{collapse_whitespace, extract_optional};
use crate::search::types::{SearchDocument, SourceRef};
use serde_json::Value;

/// Maximum excerpt length in characters, before the ellipsis.
pub const EXCERPT_LENGTH: usize = 150;

const ELLIPSIS: &str = "...";

/// Default search priority per variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchPriorities {
    /// Priority of video projections.
    pub videos: i64,
    /// Priority of category projections.
    pub categories: i64,
    /// Priority of tag projections.
    pub tags: i64,
}

impl SearchPriorities {
    /// Priority assigned to a fresh projection of `variant`.
    pub fn for_variant(&self, variant: ContentVariant) -> i64 {
        match variant {
            ContentVariant::Video => self.videos,
            ContentVariant::Category => self.categories,
            ContentVariant::Tag => self.tags,
        }
    }
}

impl Default for SearchPriorities {
    fn default() -> Self {
        Self {
            videos: ContentVariant::Video.default_priority(),
            categories: ContentVariant::Category.default_priority(),
            tags: ContentVariant::Tag.default_priority(),
        }
    }
}

/// Build the projection for `document`.
///
/// `previous` is the projection currently stored for the same source, used only for fields
/// the builder does not derive from the source (the priority).
pub fn build_projection(
    document: &ContentDocument,
    previous: Option<&SearchDocument>,
    priorities: &SearchPriorities,
) -> SearchDocument {
    let variant = document.variant();
    let id = document.id().cloned();

    let (title, description, thumbnail_url, category_names, tag_names, category_slug) =
        match document {
            ContentDocument::Video(video) => project_video(video),
            ContentDocument::Category(category) => project_category(category),
            ContentDocument::Tag(tag) => project_tag(tag),
        };

    let excerpt = excerpt(&description);
    let search_content = search_content(
        [title.as_str(), description.as_str()]
            .into_iter()
            .chain(category_names.iter().map(String::as_str))
            .chain(tag_names.iter().map(String::as_str)),
    );

    SearchDocument {
        original_doc_id: id.as_ref().map(ToString::to_string).unwrap_or_default(),
        source_variant: variant,
        source_ref: SourceRef {
            relation_to: variant,
            value: id,
        },
        title,
        description,
        excerpt,
        thumbnail_url,
        category_names,
        tag_names,
        search_content,
        priority: previous
            .map(|doc| doc.priority)
            .unwrap_or_else(|| priorities.for_variant(variant)),
        category_slug,
    }
}

type Projected = (
    String,
    String,
    Option<String>,
    Vec<String>,
    Vec<String>,
    Option<String>,
);

fn project_video(video: &VideoDocument) -> Projected {
    (
        video.title.clone().unwrap_or_default(),
        extract_optional(video.description.as_ref()),
        video.thumbnail_url.clone(),
        inlined_names(&video.categories, &["name"]),
        inlined_names(&video.tags, &["label", "name"]),
        None,
    )
}

fn project_category(category: &CategoryDocument) -> Projected {
    (
        category.name.clone().unwrap_or_default(),
        extract_optional(category.description.as_ref()),
        None,
        Vec::new(),
        Vec::new(),
        category.slug.clone().filter(|slug| !slug.trim().is_empty()),
    )
}

fn project_tag(tag: &TagDocument) -> Projected {
    let title = [&tag.name, &tag.label]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default();
    (
        title,
        extract_optional(tag.description.as_ref()),
        None,
        Vec::new(),
        Vec::new(),
        None,
    )
}

/// Names of inlined relationship entries, trying `keys` in order on each entry.
fn inlined_names(relations: &[Relation], keys: &[&str]) -> Vec<String> {
    relations
        .iter()
        .filter_map(|relation| match relation {
            Relation::Inlined(record) => first_non_empty(record, keys),
            Relation::Id(_) => None,
        })
        .collect()
}

fn first_non_empty(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Excerpt of `description`: empty for empty input, the whole text when it fits, otherwise
/// the first [`EXCERPT_LENGTH`] characters followed by `...`.
pub fn excerpt(description: &str) -> String {
    match description.char_indices().nth(EXCERPT_LENGTH) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &description[..cut]),
        None => description.to_string(),
    }
}

/// Join non-empty parts with single spaces, collapsing whitespace and trimming.
pub fn search_content<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let joined = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    collapse_whitespace(&joined)
}
