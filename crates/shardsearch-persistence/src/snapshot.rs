use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shardsearch_index::SerializedShardedIndex;
use shardsearch_types::{Document, Mappings};

/// Combined on-disk state of one index (§3's Snapshot type, §6's
/// `snapshot.json`). Document and length maps are keyed by external id —
/// the engine crate owns the internal-id translation, this crate only ever
/// sees the externally-addressable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub documents: BTreeMap<String, Document>,
    pub inverted_index: SerializedShardedIndex,
    pub doc_lengths: BTreeMap<String, u32>,
    pub total_docs: u64,
    pub avg_doc_length: f64,
    pub mappings: Mappings,
    pub facet_fields: Vec<String>,
}

/// One `shard-k/metadata.json` (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardMetadata {
    pub shard_id: usize,
    pub token_count: usize,
}

/// `global-metadata.json` (§6): the file whose presence (and whose rename
/// being the last write of a snapshot) makes the rest of the directory's
/// contents observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMetadata {
    pub total_docs: u64,
    pub avg_doc_length: f64,
    pub last_flush: i64,
    pub document_count: u64,
    pub index_count: u64,
    pub shard_metadata: Vec<ShardMetadata>,
    pub is_sharded: bool,
    pub num_shards: usize,
    pub enable_sharded_storage: bool,
    pub facet_fields: Vec<String>,
}
