use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{IoContext, Result};
use crate::snapshot::GlobalMetadata;

/// Path conventions for one index's on-disk data (§4.7): a root directory
/// holding `global-metadata.json`, `snapshot.json`, `mappings.json`, and
/// either flat `documents.jsonl`/`index.jsonl`/`doc_lengths.jsonl` or,
/// when sharded, `shard-k/` sub-directories carrying the same three files.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new(data_root: &Path, index_name: &str) -> Self {
        IndexPaths { root: data_root.join(index_name) }
    }

    pub fn global_metadata(&self) -> PathBuf {
        self.root.join("global-metadata.json")
    }

    pub fn snapshot(&self) -> PathBuf {
        self.root.join("snapshot.json")
    }

    pub fn mappings(&self) -> PathBuf {
        self.root.join("mappings.json")
    }

    pub fn documents(&self) -> PathBuf {
        self.root.join("documents.jsonl")
    }

    pub fn index(&self) -> PathBuf {
        self.root.join("index.jsonl")
    }

    pub fn doc_lengths(&self) -> PathBuf {
        self.root.join("doc_lengths.jsonl")
    }

    pub fn shard_dir(&self, k: usize) -> PathBuf {
        self.root.join(format!("shard-{k}"))
    }
}

static TIMESTAMP_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\d{13}$").unwrap());

/// Lists the shard-k sub-directories of an index root, in shard order.
pub fn shard_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    if !root.is_dir() {
        return Ok(dirs);
    }
    for entry in fs::read_dir(root).with_path(root)? {
        let entry = entry.with_path(root)?;
        if entry.file_type().with_path(root)?.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("shard-") {
                dirs.push(entry.path());
            }
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Scans `data_root` for index directories (§4.7's discovery rule): an
/// immediate subdirectory counts as an index iff its name doesn't end in a
/// 13-digit timestamp (those are backup/rotation directories) and it
/// contains a `global-metadata.json` that parses. A directory whose metadata
/// is present but corrupt is skipped with a log entry, not listed (§6's
/// "metadata files that fail to parse are skipped with a log entry and no
/// error").
pub fn discover_indices(data_root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !data_root.is_dir() {
        return Ok(names);
    }
    for entry in fs::read_dir(data_root).with_path(data_root)? {
        let entry = entry.with_path(data_root)?;
        if !entry.file_type().with_path(data_root)?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if TIMESTAMP_SUFFIX.is_match(&name) {
            continue;
        }
        let metadata_path = entry.path().join("global-metadata.json");
        let contents = match fs::read_to_string(&metadata_path) {
            Ok(contents) => contents,
            Err(_) => continue,
        };
        match serde_json::from_str::<GlobalMetadata>(&contents) {
            Ok(_) => names.push(name),
            Err(err) => tracing::warn!(index = %name, %err, "global-metadata.json did not parse, skipping"),
        }
    }
    names.sort();
    Ok(names)
}
