use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const ID_FIELD: &str = "id";
pub const INDEX_NAME_FIELD: &str = "indexName";

/// A document is an opaque field-name → value mapping. We keep it as a
/// plain `serde_json::Map` rather than a bespoke struct: ingestion is
/// schemaless, and the `Mappings` registry is the single source of type
/// truth (see `crate::mappings`).
pub type Document = Map<String, Value>;

/// Returns the document's required, non-empty `id` field.
pub fn document_id(doc: &Document) -> Result<&str> {
    match doc.get(ID_FIELD) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        _ => Err(Error::InvalidDocument),
    }
}

pub fn index_name(doc: &Document) -> Option<&str> {
    match doc.get(INDEX_NAME_FIELD) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Top-level fields, skipping `id`. Used by `Mappings::auto_extend`.
pub fn top_level_fields(doc: &Document) -> impl Iterator<Item = (&str, &Value)> {
    doc.iter().filter(|(k, _)| k.as_str() != ID_FIELD).map(|(k, v)| (k.as_str(), v))
}

/// Recursively walks a document's fields, joining nested object keys with
/// `.`, skipping `id` at the top level only, and not descending into values
/// that resolve to `geo_point` (a `{lat, lon}` object is a leaf, not a
/// nested object) — mirrors `Mappings::auto_map`'s contract in §4.2.
pub fn walk_fields<'a>(doc: &'a Document) -> Vec<(String, &'a Value)> {
    let mut out = Vec::new();
    for (key, value) in top_level_fields(doc) {
        walk_value(key.to_string(), value, &mut out);
    }
    out
}

fn walk_value<'a>(path: String, value: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) if !(map.contains_key("lat") && map.contains_key("lon")) => {
            for (k, v) in map {
                walk_value(format!("{path}.{k}"), v, out);
            }
        }
        _ => out.push((path, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_id() {
        let doc = json!({"name": "a"}).as_object().unwrap().clone();
        assert!(document_id(&doc).is_err());
    }

    #[test]
    fn rejects_empty_id() {
        let doc = json!({"id": ""}).as_object().unwrap().clone();
        assert!(document_id(&doc).is_err());
    }

    #[test]
    fn accepts_valid_id() {
        let doc = json!({"id": "doc-1"}).as_object().unwrap().clone();
        assert_eq!(document_id(&doc).unwrap(), "doc-1");
    }

    #[test]
    fn walk_fields_joins_nested_paths_and_skips_geo_point() {
        let doc = json!({
            "id": "1",
            "address": {"city": "Paris", "zip": "75000"},
            "location": {"lat": 48.8, "lon": 2.3}
        })
        .as_object()
        .unwrap()
        .clone();
        let fields = walk_fields(&doc);
        let paths: Vec<_> = fields.iter().map(|(p, _)| p.as_str()).collect();
        assert!(paths.contains(&"address.city"));
        assert!(paths.contains(&"address.zip"));
        assert!(paths.contains(&"location"));
        assert!(!paths.contains(&"location.lat"));
    }
}
