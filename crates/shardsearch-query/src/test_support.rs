//! Test-only corpus builder: indexes a handful of documents the same way
//! `shardsearch-engine`'s indexer does, so `plan.rs` and friends can be
//! exercised without depending on that crate.
#![cfg(test)]

use std::collections::HashMap;

use serde_json::Value;
use shardsearch_index::{exact_token, field_token, DocumentRepository, InternalId, ShardedInvertedIndex};
use shardsearch_tokenizer::{analyzer_for_field_type, tokenize, Stopwords};
use shardsearch_types::{FieldType, Mappings};

use crate::corpus::Corpus;

pub struct CorpusFixture {
    pub mappings: Mappings,
    pub index: ShardedInvertedIndex,
    pub repository: DocumentRepository,
    pub doc_lengths: HashMap<InternalId, u32>,
    pub stopwords: Stopwords,
    pub total_docs: u64,
    pub avg_doc_len: f64,
}

impl CorpusFixture {
    pub fn corpus(&self) -> Corpus<'_> {
        Corpus {
            mappings: &self.mappings,
            index: &self.index,
            repository: &self.repository,
            doc_lengths: &self.doc_lengths,
            total_docs: self.total_docs,
            avg_doc_len: self.avg_doc_len,
            stopwords: &self.stopwords,
        }
    }

    /// Indexes one more document the same way `build_corpus` seeds its
    /// initial set, recomputing `total_docs`/`avg_doc_len` afterward.
    pub fn add(&mut self, value: Value) -> InternalId {
        let doc = value.as_object().unwrap().clone();
        self.mappings.auto_extend(&doc);
        let outcome = self.repository.save(doc.clone()).unwrap();
        let mut length = 0u32;
        for (field, field_value) in doc.iter() {
            if field == "id" {
                continue;
            }
            let ty = self.mappings.get(field).unwrap_or(FieldType::Text);
            if ty.is_text_like() {
                if let Some(text) = field_value.as_str() {
                    let analyzer = analyzer_for_field_type(ty);
                    for (pos, token) in tokenize(text, &analyzer, &self.stopwords).into_iter().enumerate() {
                        self.index.add_token(&field_token(field, &token), outcome.internal_id, pos as u32);
                        length += 1;
                    }
                }
            }
            self.index.add_token(&exact_token(field, field_value), outcome.internal_id, 0);
        }
        self.doc_lengths.insert(outcome.internal_id, length);
        self.recompute_totals();
        outcome.internal_id
    }

    /// Removes a document from both the repository and the index, freeing
    /// its internal id for recycling the way a live engine's delete does.
    pub fn remove(&mut self, id: &str) {
        if let Some(internal_id) = self.repository.internal_id(id) {
            self.index.delete_document(internal_id);
            self.doc_lengths.remove(&internal_id);
        }
        self.repository.remove(id);
        self.recompute_totals();
    }

    fn recompute_totals(&mut self) {
        self.total_docs = self.repository.len() as u64;
        self.avg_doc_len = if self.total_docs == 0 {
            0.0
        } else {
            self.doc_lengths.values().sum::<u32>() as f64 / self.total_docs as f64
        };
    }
}

pub fn build_corpus(docs: Vec<Value>) -> CorpusFixture {
    let mappings = Mappings::new();
    let index = ShardedInvertedIndex::new(4).unwrap();
    let repository = DocumentRepository::new();
    let doc_lengths = HashMap::new();
    let stopwords = Stopwords::new();

    let mut fixture = CorpusFixture { mappings, index, repository, doc_lengths, stopwords, total_docs: 0, avg_doc_len: 0.0 };
    for value in docs {
        fixture.add(value);
    }
    fixture
}
