//! Plain-text extraction for rich-text descriptions.
//!
//! Rich text arrives as an editor tree: a `root` object whose `children` array holds typed
//! nodes, where `text` nodes carry literal strings and container nodes carry their own
//! `children`. Extraction flattens that tree into a single whitespace-normalized string.

use serde_json::Value;

/// Node type carrying literal text.
const TEXT_NODE: &str = "text";

/// Return `true` when `content` looks like a rich-text tree (`{"root": {"children": [..]}}`).
pub fn is_rich_text(content: &Value) -> bool {
    root_children(content).is_some()
}

/// Flatten rich text into plain text.
///
/// - Strings are returned unchanged without any tree walk.
/// - Recognized rich-text trees are walked depth-first, left to right; the result has every
///   whitespace run collapsed to one space and is trimmed.
/// - Anything else (null, numbers, arrays, unrecognized objects) yields an empty string.
///
/// Never panics, and re-running the extractor on its own output returns the same string.
pub fn extract_plain_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        other => match root_children(other) {
            Some(children) => collapse_whitespace(&join_nodes(children)),
            None => String::new(),
        },
    }
}

/// Convenience wrapper for optional fields.
pub fn extract_optional(content: Option<&Value>) -> String {
    content.map(extract_plain_text).unwrap_or_default()
}

/// Collapse every run of whitespace to a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn root_children(content: &Value) -> Option<&Vec<Value>> {
    content.as_object()?.get("root")?.as_object()?.get("children")?.as_array()
}

fn join_nodes(nodes: &[Value]) -> String {
    nodes.iter().map(node_text).collect::<Vec<_>>().join(" ")
}

fn node_text(node: &Value) -> String {
    let Some(object) = node.as_object() else {
        return String::new();
    };
    if object.get("type").and_then(Value::as_str) == Some(TEXT_NODE)
        && let Some(text) = object.get("text").and_then(Value::as_str)
    {
        return text.to_string();
    }
    match object.get("children").and_then(Value::as_array) {
        Some(children) => collapse_whitespace(&join_nodes(children)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paragraph(texts: &[&str]) -> Value {
        json!({
            "type": "paragraph",
            "children": texts
                .iter()
                .map(|text| json!({ "type": "text", "text": text }))
                .collect::<Vec<_>>()
        })
    }

    #[test]
    fn non_tree_inputs_yield_empty_string() {
        assert_eq!(extract_plain_text(&Value::Null), "");
        assert_eq!(extract_plain_text(&json!(42)), "");
        assert_eq!(extract_plain_text(&json!(true)), "");
        assert_eq!(extract_plain_text(&json!(["a", "b"])), "");
        assert_eq!(extract_plain_text(&json!({ "foo": "bar" })), "");
        assert_eq!(extract_plain_text(&json!({ "root": null })), "");
        assert_eq!(extract_plain_text(&json!({ "root": { "children": "nope" } })), "");
        assert_eq!(extract_optional(None), "");
    }

    #[test]
    fn strings_are_returned_unchanged() {
        let raw = json!("  already   plain  ");
        assert_eq!(extract_plain_text(&raw), "  already   plain  ");
    }

    #[test]
    fn walks_tree_depth_first_and_normalizes_whitespace() {
        let tree = json!({
            "root": {
                "type": "root",
                "children": [
                    paragraph(&["Hello", "  world "]),
                    {
                        "type": "list",
                        "children": [
                            { "type": "listitem", "children": [ { "type": "text", "text": "one\n" } ] },
                            { "type": "listitem", "children": [ { "type": "text", "text": "\ttwo" } ] }
                        ]
                    },
                    { "type": "horizontalrule" },
                    "not-a-node"
                ]
            }
        });

        assert_eq!(extract_plain_text(&tree), "Hello world one two");
        assert!(is_rich_text(&tree));
    }

    #[test]
    fn text_node_without_string_falls_back_to_children() {
        let tree = json!({
            "root": {
                "children": [
                    { "type": "text", "text": 7, "children": [ { "type": "text", "text": "nested" } ] }
                ]
            }
        });
        assert_eq!(extract_plain_text(&tree), "nested");
    }

    #[test]
    fn extraction_is_idempotent() {
        let tree = json!({ "root": { "children": [paragraph(&["a  b", "c"])] } });
        let once = extract_plain_text(&tree);
        let twice = extract_plain_text(&Value::String(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_tree_is_empty() {
        assert_eq!(extract_plain_text(&json!({ "root": { "children": [] } })), "");
    }
}
