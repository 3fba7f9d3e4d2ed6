use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::vector_clock::VectorClock;

const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Add,
    Update,
    Delete,
}

/// One entry of the bounded CRDT operation log (§4.6/§9): carries enough to
/// let a worker or the coordinator replay or dedup a write after a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpLogEntry {
    pub op_id: String,
    pub kind: OpKind,
    pub index_name: String,
    pub document_id: Option<String>,
    pub timestamp: i64,
    pub vector_clock: VectorClock,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Ring buffer of the last [`MAX_LOG_ENTRIES`] operations, plus a parallel
/// id set for O(1) duplicate detection. Entries are evicted from both
/// structures together so the dedup set never outlives the entries it
/// guards.
#[derive(Debug, Default)]
pub struct OperationLog {
    entries: VecDeque<OpLogEntry>,
    seen: HashSet<String>,
}

impl OperationLog {
    pub fn new() -> Self {
        OperationLog { entries: VecDeque::new(), seen: HashSet::new() }
    }

    pub fn contains(&self, op_id: &str) -> bool {
        self.seen.contains(op_id)
    }

    /// Appends `entry`, evicting the oldest one if the log is at capacity.
    /// Returns `false` without mutating anything if `entry`'s id is already
    /// present (§7: duplicate ops are discarded, not replayed).
    pub fn append(&mut self, entry: OpLogEntry) -> bool {
        if self.seen.contains(&entry.op_id) {
            return false;
        }
        if self.entries.len() >= MAX_LOG_ENTRIES {
            if let Some(oldest) = self.entries.pop_front() {
                self.seen.remove(&oldest.op_id);
            }
        }
        self.seen.insert(entry.op_id.clone());
        self.entries.push_back(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose vector clock is newer than `since`, used by the 10s
    /// cross-worker sync tick.
    pub fn newer_than(&self, since: &VectorClock) -> Vec<&OpLogEntry> {
        self.entries.iter().filter(|e| crate::vector_clock::is_newer(&e.vector_clock, since)).collect()
    }
}
