use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use shardsearch_index::{SerializedShard, SerializedShardedIndex};
use shardsearch_types::{Document, Mappings};
use tracing::{debug, warn};

use crate::error::{IoContext, Result};
use crate::layout::{shard_dirs, IndexPaths};
use crate::snapshot::{GlobalMetadata, Snapshot};

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_path(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_documents_jsonl(path: &Path) -> Result<BTreeMap<String, Document>> {
    let file = fs::File::open(path).with_path(path)?;
    let mut out = BTreeMap::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_path(path)?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(&line)?;
        if let Some(id) = doc.get("id").and_then(|v| v.as_str()) {
            out.insert(id.to_string(), doc);
        }
    }
    Ok(out)
}

/// Reads one index's state back into a [`Snapshot`]. Prefers the combined
/// `snapshot.json`; when it's missing or empty (a crash between the
/// per-file writes and the combined write, or a sharded-only layout),
/// falls back to reassembling from the flat or per-shard files (§4.7).
pub fn read_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let snapshot_path = paths.snapshot();
    if snapshot_path.is_file() {
        let content = fs::read_to_string(&snapshot_path).with_path(&snapshot_path)?;
        if !content.trim().is_empty() {
            return Ok(serde_json::from_str(&content)?);
        }
    }
    debug!(index_root = %paths.root.display(), "combined snapshot.json missing or empty, reassembling from parts");

    let metadata: GlobalMetadata = read_json(&paths.global_metadata())?;
    let mappings: Mappings = read_json(&paths.mappings())?;

    let documents = if paths.documents().is_file() {
        read_documents_jsonl(&paths.documents())?
    } else {
        aggregate_sharded_documents(&paths.root)?
    };

    let doc_lengths: BTreeMap<String, u32> = if paths.doc_lengths().is_file() {
        read_json(&paths.doc_lengths())?
    } else {
        aggregate_sharded_doc_lengths(&paths.root)?
    };

    let inverted_index = if paths.index().is_file() {
        read_json(&paths.index())?
    } else {
        reassemble_sharded_index(&paths.root)?
    };

    Ok(Snapshot {
        documents,
        inverted_index,
        doc_lengths,
        total_docs: metadata.total_docs,
        avg_doc_length: metadata.avg_doc_length,
        mappings,
        facet_fields: metadata.facet_fields,
    })
}

fn aggregate_sharded_documents(root: &Path) -> Result<BTreeMap<String, Document>> {
    let mut out = BTreeMap::new();
    for dir in shard_dirs(root)? {
        let path = dir.join("documents.jsonl");
        if path.is_file() {
            out.extend(read_documents_jsonl(&path)?);
        } else {
            warn!(shard = %dir.display(), "shard directory missing documents.jsonl");
        }
    }
    Ok(out)
}

fn aggregate_sharded_doc_lengths(root: &Path) -> Result<BTreeMap<String, u32>> {
    let mut out = BTreeMap::new();
    for dir in shard_dirs(root)? {
        let path = dir.join("doc_lengths.jsonl");
        if path.is_file() {
            let lengths: BTreeMap<String, u32> = read_json(&path)?;
            out.extend(lengths);
        }
    }
    Ok(out)
}

fn reassemble_sharded_index(root: &Path) -> Result<SerializedShardedIndex> {
    let dirs = shard_dirs(root)?;
    let mut shards: Vec<SerializedShard> = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let shard: SerializedShard = read_json(&dir.join("index.jsonl"))?;
        shards.push(shard);
    }
    let num_shards = shards.len();
    Ok(SerializedShardedIndex { num_shards, shards })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_nothing_under_a_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        assert!(shard_dirs(&missing).unwrap().is_empty());
    }
}
