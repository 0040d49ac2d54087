//! Helpers for constructing Qdrant point ids and payloads from search documents.

use crate::content::types::{ContentVariant, DocumentId};
use crate::search::SearchDocument;
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Deterministic point id for a source document: the first 16 bytes of
/// `SHA-256("<variant>:<id>")` read as a UUID.
pub fn point_id(variant: ContentVariant, id: &DocumentId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", variant.slug(), id).as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

/// Build the payload stored alongside each point: the serialized document plus an
/// `indexedAt` timestamp.
pub(crate) fn build_payload(
    document: &SearchDocument,
    timestamp_rfc3339: &str,
) -> Result<Value, serde_json::Error> {
    let mut payload = serde_json::to_value(document)?;
    if let Value::Object(map) = &mut payload {
        map.insert(
            "indexedAt".into(),
            Value::String(timestamp_rfc3339.to_string()),
        );
    }
    Ok(payload)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::ContentDocument;
    use crate::search::{SearchPriorities, build_projection};
    use serde_json::json;

    #[test]
    fn point_id_is_stable_and_variant_scoped() {
        let id = DocumentId::Number(1);
        let first = point_id(ContentVariant::Video, &id);
        assert_eq!(first, point_id(ContentVariant::Video, &id));
        assert_ne!(first, point_id(ContentVariant::Tag, &id));
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_embeds_document_and_timestamp() {
        let doc = ContentDocument::from_record(
            ContentVariant::Video,
            json!({ "id": 3, "title": "T" }).as_object().unwrap(),
        );
        let projection = build_projection(&doc, None, &SearchPriorities::default());
        let payload = build_payload(&projection, "2025-01-01T00:00:00Z").unwrap();
        assert_eq!(payload["originalDocId"], "3");
        assert_eq!(payload["sourceVariant"], "videos");
        assert_eq!(payload["sourceRef"], json!({ "relationTo": "videos", "value": 3 }));
        assert_eq!(payload["indexedAt"], "2025-01-01T00:00:00Z");

        let decoded: SearchDocument = serde_json::from_value(payload).unwrap();
        assert_eq!(decoded, projection);
    }
}
