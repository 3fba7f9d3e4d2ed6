use std::collections::HashMap;

use shardsearch_index::{DocumentRepository, InternalId, ShardedInvertedIndex};
use shardsearch_tokenizer::Stopwords;
use shardsearch_types::Mappings;

/// Borrowed view over everything a query needs to execute against one
/// index: the type registry, the sharded postings, the document store, and
/// the per-document length table BM25 normalizes against.
pub struct Corpus<'a> {
    pub mappings: &'a Mappings,
    pub index: &'a ShardedInvertedIndex,
    pub repository: &'a DocumentRepository,
    pub doc_lengths: &'a HashMap<InternalId, u32>,
    pub total_docs: u64,
    pub avg_doc_len: f64,
    pub stopwords: &'a Stopwords,
}

impl<'a> Corpus<'a> {
    pub fn doc_len(&self, doc: InternalId) -> u32 {
        self.doc_lengths.get(&doc).copied().unwrap_or(0)
    }
}
