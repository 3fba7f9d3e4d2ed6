use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{document_id, top_level_fields, walk_fields, Document};
use crate::field_type::{infer, FieldType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Field → type registry for one index, plus a monotonically increasing
/// `version` that advances on every structural change (§3). Once a field is
/// registered its type is permanent unless explicitly overwritten with
/// [`Mappings::set`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mappings {
    pub version: u64,
    pub properties: BTreeMap<String, FieldMapping>,
}

impl Mappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<FieldType> {
        self.properties.get(field).map(|m| m.field_type)
    }

    /// Explicit, caller-driven overwrite. Always bumps the version.
    pub fn set(&mut self, field: impl Into<String>, field_type: FieldType) {
        self.properties.insert(field.into(), FieldMapping { field_type });
        self.version += 1;
    }

    fn register_if_unknown(&mut self, field: &str, field_type: FieldType) -> bool {
        if self.properties.contains_key(field) {
            return false;
        }
        self.properties.insert(field.to_string(), FieldMapping { field_type });
        true
    }

    /// Walks the document's top-level keys (skipping `id`) and registers any
    /// field not already known, inferring its type. Bumps `version` once if
    /// anything new was discovered.
    pub fn auto_extend(&mut self, doc: &Document) {
        let mut changed = false;
        for (field, value) in top_level_fields(doc) {
            let ty = infer(value, self.get(field) == Some(FieldType::Integer));
            if self.register_if_unknown(field, ty) {
                changed = true;
                debug!(field, ?ty, "auto-extended mapping");
            }
        }
        if changed {
            self.version += 1;
        }
    }

    /// Recursive variant of [`Mappings::auto_extend`]: walks nested objects,
    /// registering dotted field paths, skipping `geo_point` descent per
    /// §4.2.
    pub fn auto_map(&mut self, doc: &Document) {
        let mut changed = false;
        for (path, value) in walk_fields(doc) {
            let ty = infer(value, self.get(&path) == Some(FieldType::Integer));
            if self.register_if_unknown(&path, ty) {
                changed = true;
            }
        }
        if changed {
            self.version += 1;
        }
    }

    /// Fields currently typed as one of the text-like types, i.e. what
    /// `match{field:"*"}` expands over.
    pub fn text_like_fields(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|(_, m)| m.field_type.is_text_like())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Ensures `doc` carries a valid id and folds its fields into `mappings`.
/// This is the validate+auto-extend step referenced in §3's Mappings
/// invariant; it never fails on unknown fields (those absorb silently per
/// §7's "local recovery" policy) but does propagate a missing/empty id.
pub fn validate_and_extend(mappings: &mut Mappings, doc: &Document) -> crate::error::Result<()> {
    document_id(doc)?;
    mappings.auto_extend(doc);
    Ok(())
}
