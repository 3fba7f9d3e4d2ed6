use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use shardsearch_index::{DocumentRepository, InternalId, ShardedInvertedIndex};
use shardsearch_persistence::Snapshot;
use shardsearch_query::{execute, Corpus, Query, SearchContext, SearchResult};
use shardsearch_tokenizer::Stopwords;
use shardsearch_types::{document_id, Document, Mappings};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::indexer::index_document;
use crate::stats::Stats;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AddOutcome {
    pub id: String,
    pub was_added: bool,
}

/// Aggregate owning one index's full in-memory state (§3): the type
/// registry, the shared stop-word set, the sharded postings, the document
/// store, and the per-document length table BM25 normalizes against.
pub struct SearchEngine {
    pub name: String,
    pub mappings: Mappings,
    pub stopwords: Stopwords,
    pub index: ShardedInvertedIndex,
    pub repository: DocumentRepository,
    pub doc_lengths: HashMap<InternalId, u32>,
    pub facet_fields: Vec<String>,
    pub sharded: bool,
    total_length: u64,
    last_flush: Option<i64>,
}

impl SearchEngine {
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Result<Self> {
        let num_shards = if config.sharding { config.num_shards.max(1) } else { 1 };
        if num_shards == 0 {
            return Err(Error::InvalidParameter("numShards must be >= 1".into()));
        }
        Ok(SearchEngine {
            name: name.into(),
            mappings: config.mappings.unwrap_or_default(),
            stopwords: Stopwords::new(),
            index: ShardedInvertedIndex::new(num_shards)?,
            repository: DocumentRepository::new(),
            doc_lengths: HashMap::new(),
            facet_fields: config.facet_fields,
            sharded: config.sharding,
            total_length: 0,
            last_flush: None,
        })
    }

    pub fn total_docs(&self) -> u64 {
        self.repository.len() as u64
    }

    pub fn avg_doc_len(&self) -> f64 {
        let total = self.total_docs();
        if total == 0 {
            0.0
        } else {
            self.total_length as f64 / total as f64
        }
    }

    /// Adds or skips each document (§4.6, §7's `Duplicate` policy): a
    /// document whose id already exists in the repository is left entirely
    /// untouched and reported with `was_added: false` — this operation never
    /// upserts. A document missing a valid id fails the whole batch
    /// synchronously, before any document in it is applied.
    pub fn add_documents(&mut self, docs: Vec<Document>) -> Result<Vec<AddOutcome>> {
        for doc in &docs {
            document_id(doc)?;
        }
        let mut outcomes = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = document_id(&doc)?.to_string();
            if self.repository.contains(&id) {
                outcomes.push(AddOutcome { id, was_added: false });
                continue;
            }
            self.mappings.auto_map(&doc);
            let outcome = self.repository.save(doc.clone())?;
            let length = index_document(&mut self.index, &self.mappings, &self.stopwords, outcome.internal_id, &doc);
            self.doc_lengths.insert(outcome.internal_id, length);
            self.total_length += length as u64;
            outcomes.push(AddOutcome { id, was_added: true });
        }
        debug!(index = %self.name, added = outcomes.iter().filter(|o| o.was_added).count(), "add_documents");
        Ok(outcomes)
    }

    /// Removes a document from the repository and broadcasts its removal to
    /// every shard it may have tokens in (§4.6). Returns `NotFound` if the
    /// id is absent.
    pub fn delete_document(&mut self, id: &str) -> Result<()> {
        let internal_id = self.repository.internal_id(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.repository.remove(id);
        self.index.delete_document(internal_id);
        if let Some(length) = self.doc_lengths.remove(&internal_id) {
            self.total_length = self.total_length.saturating_sub(length as u64);
        }
        Ok(())
    }

    fn corpus(&self) -> Corpus<'_> {
        Corpus {
            mappings: &self.mappings,
            index: &self.index,
            repository: &self.repository,
            doc_lengths: &self.doc_lengths,
            total_docs: self.total_docs(),
            avg_doc_len: self.avg_doc_len(),
            stopwords: &self.stopwords,
        }
    }

    pub fn search(&self, query: &Query, context: &SearchContext) -> Result<SearchResult> {
        let facet_size = None;
        Ok(execute(query, context, &self.corpus(), &self.facet_fields, facet_size)?)
    }

    pub fn get_facets(&self) -> HashMap<String, shardsearch_query::FacetResult> {
        let corpus = self.corpus();
        let candidates: roaring::RoaringBitmap =
            self.repository.iter().filter_map(|(ext, _)| self.repository.internal_id(ext)).collect();
        if self.facet_fields.is_empty() {
            shardsearch_query::facets::auto_discover_facets(&corpus, &candidates)
        } else {
            shardsearch_query::facets::compute_facets(&corpus, &candidates, &self.facet_fields, 20)
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_docs: self.total_docs(),
            avg_doc_length: self.avg_doc_len(),
            num_shards: self.index.num_shards(),
            facet_fields: self.facet_fields.clone(),
            mappings_version: self.mappings.version,
            last_flush: self.last_flush,
        }
    }

    pub fn mark_flushed(&mut self, at_epoch_millis: i64) {
        self.last_flush = Some(at_epoch_millis);
    }

    pub fn last_flush(&self) -> Option<i64> {
        self.last_flush
    }

    /// Materializes the full persistable state (§3's Snapshot), translating
    /// doc lengths from internal to external ids — the persistence crate
    /// never sees internal ids.
    pub fn to_snapshot(&self) -> Snapshot {
        let documents: BTreeMap<String, Document> =
            self.repository.iter().map(|(id, doc)| (id.to_string(), doc.clone())).collect();
        let doc_lengths: BTreeMap<String, u32> = self
            .doc_lengths
            .iter()
            .filter_map(|(internal, len)| self.repository.external_id(*internal).map(|ext| (ext.to_string(), *len)))
            .collect();
        Snapshot {
            documents,
            inverted_index: self.index.serialize(),
            doc_lengths,
            total_docs: self.total_docs(),
            avg_doc_length: self.avg_doc_len(),
            mappings: self.mappings.clone(),
            facet_fields: self.facet_fields.clone(),
        }
    }

    /// Rebuilds a `SearchEngine`'s in-memory state from a restored snapshot
    /// (§4.7: "Restore rebuilds the in-memory state... before accepting
    /// writes"). Internal ids are not part of the persisted format — only
    /// the stable external id is — so rather than deserializing the
    /// persisted postings verbatim (which would reference internal ids from
    /// a repository that no longer exists), documents are replayed through
    /// the same indexer a live `add_documents` call would use, keyed by the
    /// internal ids this fresh repository assigns. The persisted shard
    /// count is preserved; shard contents are rebuilt, not replayed.
    pub fn from_snapshot(name: impl Into<String>, snapshot: Snapshot, sharded: bool) -> Result<Self> {
        let name = name.into();
        let num_shards = snapshot.inverted_index.num_shards.max(1);
        let mut repository = DocumentRepository::new();
        let mut index = ShardedInvertedIndex::new(num_shards)?;
        let stopwords = Stopwords::new();
        let mut doc_lengths = HashMap::new();
        let mut total_length = 0u64;
        for (_id, doc) in &snapshot.documents {
            let outcome = repository.save(doc.clone())?;
            let length = index_document(&mut index, &snapshot.mappings, &stopwords, outcome.internal_id, doc);
            doc_lengths.insert(outcome.internal_id, length);
            total_length += length as u64;
        }
        info!(index = %name, docs = repository.len(), "restored engine from snapshot");
        Ok(SearchEngine {
            name,
            mappings: snapshot.mappings,
            stopwords,
            index,
            repository,
            doc_lengths,
            facet_fields: snapshot.facet_fields,
            sharded,
            total_length,
            last_flush: None,
        })
    }
}
