use std::collections::HashMap;

use shardsearch_types::{document_id, Document};

use crate::error::{Error, Result};

/// Internal, dense document id. Postings and the doc-length table reference
/// documents by this id rather than by their external string id — the same
/// split `milli`'s `ExternalDocumentsIds`/`DocumentId` makes, done here with
/// a plain in-memory map instead of an LMDB database.
pub type InternalId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub internal_id: InternalId,
    pub sequence: u64,
    pub was_new: bool,
}

/// `id → document` plus a monotonic per-index sequence counter and an
/// `id → sequence` map (§3). Sequence increments on every save, insert or
/// overwrite.
#[derive(Debug, Default)]
pub struct DocumentRepository {
    documents: HashMap<String, Document>,
    sequences: HashMap<String, u64>,
    external_to_internal: HashMap<String, InternalId>,
    internal_to_external: Vec<Option<String>>,
    free_internal_ids: Vec<InternalId>,
    next_seq: u64,
}

impl DocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn sequence_of(&self, id: &str) -> Option<u64> {
        self.sequences.get(id).copied()
    }

    pub fn internal_id(&self, id: &str) -> Option<InternalId> {
        self.external_to_internal.get(id).copied()
    }

    pub fn external_id(&self, internal: InternalId) -> Option<&str> {
        self.internal_to_external.get(internal as usize).and_then(|o| o.as_deref())
    }

    fn allocate_internal_id(&mut self, id: &str) -> InternalId {
        if let Some(existing) = self.external_to_internal.get(id) {
            return *existing;
        }
        let internal = self.free_internal_ids.pop().unwrap_or_else(|| {
            let next = self.internal_to_external.len() as InternalId;
            self.internal_to_external.push(None);
            next
        });
        self.internal_to_external[internal as usize] = Some(id.to_string());
        self.external_to_internal.insert(id.to_string(), internal);
        internal
    }

    /// Unconditional upsert: validates the document carries a non-empty
    /// `id`, assigns (or reuses) its internal id, stores it, and bumps the
    /// sequence counter. Duplicate-on-add rejection (§7) is a policy layered
    /// on top by the caller, not something this primitive enforces.
    pub fn save(&mut self, doc: Document) -> Result<SaveOutcome> {
        let id = document_id(&doc).map_err(|_| Error::InvalidParameter("missing or empty id".into()))?.to_string();
        let was_new = !self.documents.contains_key(&id);
        let internal_id = self.allocate_internal_id(&id);
        let sequence = self.next_seq;
        self.next_seq += 1;
        self.documents.insert(id.clone(), doc);
        self.sequences.insert(id, sequence);
        Ok(SaveOutcome { internal_id, sequence, was_new })
    }

    /// Removes a document, freeing its internal id for reuse once the
    /// caller has also broadcast the removal to the inverted index (see
    /// `ShardedInvertedIndex::delete_document`) — the free-list only
    /// recycles ids that no posting references anymore.
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let doc = self.documents.remove(id)?;
        self.sequences.remove(id);
        if let Some(internal) = self.external_to_internal.remove(id) {
            self.internal_to_external[internal as usize] = None;
            self.free_internal_ids.push(internal);
        }
        Some(doc)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// External ids in repository-sequence order, the insertion-order
    /// fallback used when a query has no scoring clauses (§4.5).
    pub fn ids_by_sequence(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.documents.keys().map(|s| s.as_str()).collect();
        ids.sort_by_key(|id| self.sequences.get(*id).copied().unwrap_or(u64::MAX));
        ids
    }
}
