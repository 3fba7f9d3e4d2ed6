//! Document value model, field-type inference, and the mappings registry.
//!
//! This crate owns §3/§4.2 of the design: documents are schemaless
//! `serde_json` maps, and [`Mappings`] is the single source of type truth
//! that ingestion auto-extends as unknown fields are discovered.

pub mod document;
pub mod error;
pub mod field_type;
pub mod mappings;

pub use document::{document_id, index_name, top_level_fields, walk_fields, Document, ID_FIELD, INDEX_NAME_FIELD};
pub use error::{Error, Result};
pub use field_type::{infer as infer_field_type, FieldType};
pub use mappings::{validate_and_extend, FieldMapping, Mappings};
