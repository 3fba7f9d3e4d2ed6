use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use shardsearch_index::SerializedShard;
use tracing::debug;

use crate::error::{IoContext, Result};
use crate::layout::IndexPaths;
use crate::snapshot::{GlobalMetadata, Snapshot};

/// Writes `value` to `path` via a same-directory temp file plus rename, so
/// readers never observe a half-written file (§4.7's write protocol, option
/// (b)).
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let file = File::create(&tmp).with_path(&tmp)?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    }
    fs::rename(&tmp, path).with_path(path)?;
    Ok(())
}

fn write_jsonl_atomic<'a, T: Serialize + 'a>(path: &Path, items: impl Iterator<Item = &'a T>) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp).with_path(&tmp)?);
        for item in items {
            serde_json::to_writer(&mut w, item)?;
            w.write_all(b"\n")?;
        }
        w.flush().with_path(&tmp)?;
    }
    fs::rename(&tmp, path).with_path(path)?;
    Ok(())
}

/// Writes one index's full on-disk state. `shards` is `Some` for a sharded
/// index and drives the `shard-k/` sub-directories; the flat
/// `documents.jsonl`/`index.jsonl`/`doc_lengths.jsonl` files are always
/// written too so a non-sharded reader (or a fallback path) always has
/// something to read. `global-metadata.json` is written last: its presence
/// is what makes the rest of the snapshot observable (§4.7).
pub fn write_snapshot(paths: &IndexPaths, snapshot: &Snapshot, metadata: &GlobalMetadata, shards: Option<&[SerializedShard]>) -> Result<()> {
    fs::create_dir_all(&paths.root).with_path(&paths.root)?;

    write_json_atomic(&paths.mappings(), &snapshot.mappings)?;
    write_jsonl_atomic(&paths.documents(), snapshot.documents.values())?;
    write_json_atomic(&paths.index(), &snapshot.inverted_index)?;
    write_json_atomic(&paths.doc_lengths(), &snapshot.doc_lengths)?;
    write_json_atomic(&paths.snapshot(), snapshot)?;

    if let Some(shards) = shards {
        for (k, shard) in shards.iter().enumerate() {
            let dir = paths.shard_dir(k);
            fs::create_dir_all(&dir).with_path(&dir)?;
            write_json_atomic(&dir.join("metadata.json"), &serde_json::json!({"shardId": k}))?;
            write_jsonl_atomic(&dir.join("documents.jsonl"), snapshot.documents.values())?;
            write_json_atomic(&dir.join("index.jsonl"), shard)?;
            write_json_atomic(&dir.join("doc_lengths.jsonl"), &snapshot.doc_lengths)?;
        }
    }

    write_json_atomic(&paths.global_metadata(), metadata)?;
    debug!(index_root = %paths.root.display(), total_docs = metadata.total_docs, "wrote snapshot");
    Ok(())
}
