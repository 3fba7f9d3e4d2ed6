use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::repository::InternalId;

/// `token → {docId → sorted positions}`, owned independently of every other
/// shard (§4.3). A `BTreeMap` keeps doc ids sorted for free, which is what
/// `serialize` needs for its determinism guarantee.
#[derive(Debug, Default, Clone)]
pub struct Shard {
    postings: BTreeMap<String, BTreeMap<InternalId, Vec<u32>>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedShard {
    /// `(token, [(docId, positions)])`, tokens and doc ids both ascending.
    pub tokens: Vec<(String, Vec<(InternalId, Vec<u32>)>)>,
}

impl Shard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `position` into the sorted, deduplicated position list for
    /// `(token, doc_id)`, creating the entry lazily.
    pub fn add_token(&mut self, token: &str, doc_id: InternalId, position: u32) {
        let positions = self.postings.entry(token.to_string()).or_default().entry(doc_id).or_default();
        match positions.binary_search(&position) {
            Ok(_) => {}
            Err(idx) => positions.insert(idx, position),
        }
    }

    /// Removes `doc_id` from every posting list it appears in. Tokens whose
    /// postings become empty are dropped outright — §4.3 leaves this an
    /// implementation choice, and `get_posting`/`document_frequency` treat
    /// an absent token identically to one with only empty postings, so
    /// external observers can't tell the difference.
    pub fn delete_document(&mut self, doc_id: InternalId) {
        self.postings.retain(|_token, docs| {
            docs.remove(&doc_id);
            !docs.is_empty()
        });
    }

    pub fn get_posting(&self, token: &str) -> BTreeMap<InternalId, Vec<u32>> {
        self.postings.get(token).cloned().unwrap_or_default()
    }

    pub fn term_frequency(&self, token: &str, doc_id: InternalId) -> usize {
        self.postings.get(token).and_then(|docs| docs.get(&doc_id)).map(|p| p.len()).unwrap_or(0)
    }

    pub fn document_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.postings.contains_key(token)
    }

    /// Tokens indexed in this shard starting with `prefix`, for `prefix`
    /// queries (§4.5).
    pub fn tokens_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.postings.range(prefix.to_string()..).map(|(t, _)| t.as_str()).take_while(move |t| t.starts_with(prefix))
    }

    pub fn all_tokens(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(|s| s.as_str())
    }

    pub fn serialize(&self) -> SerializedShard {
        let tokens = self
            .postings
            .iter()
            .map(|(token, docs)| {
                let docs: Vec<_> = docs.iter().map(|(id, pos)| (*id, pos.clone())).collect();
                (token.clone(), docs)
            })
            .collect();
        SerializedShard { tokens }
    }

    pub fn deserialize(serialized: SerializedShard) -> Self {
        let mut postings = BTreeMap::new();
        for (token, docs) in serialized.tokens {
            postings.insert(token, docs.into_iter().collect());
        }
        Shard { postings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_stay_sorted_and_deduplicated() {
        let mut shard = Shard::new();
        shard.add_token("hello", 1, 5);
        shard.add_token("hello", 1, 2);
        shard.add_token("hello", 1, 5);
        shard.add_token("hello", 1, 8);
        let posting = shard.get_posting("hello");
        assert_eq!(posting.get(&1).unwrap(), &vec![2, 5, 8]);
        assert_eq!(shard.term_frequency("hello", 1), 3);
    }

    #[test]
    fn delete_document_removes_from_every_posting() {
        let mut shard = Shard::new();
        shard.add_token("a", 1, 0);
        shard.add_token("b", 1, 0);
        shard.add_token("a", 2, 0);
        shard.delete_document(1);
        assert_eq!(shard.term_frequency("a", 1), 0);
        assert!(shard.get_posting("b").is_empty());
        assert_eq!(shard.document_frequency("a"), 1);
    }

    #[test]
    fn serialize_deserialize_round_trips() {
        let mut shard = Shard::new();
        shard.add_token("z", 3, 1);
        shard.add_token("a", 1, 0);
        shard.add_token("a", 2, 4);
        let serialized = shard.serialize();
        // deterministic: tokens ascending
        let tokens: Vec<_> = serialized.tokens.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens, vec!["a", "z"]);
        let restored = Shard::deserialize(serialized);
        assert_eq!(restored.get_posting("a"), shard.get_posting("a"));
        assert_eq!(restored.get_posting("z"), shard.get_posting("z"));
    }

    #[test]
    fn prefix_scan() {
        let mut shard = Shard::new();
        shard.add_token("apple", 1, 0);
        shard.add_token("application", 2, 0);
        shard.add_token("banana", 3, 0);
        let hits: Vec<_> = shard.tokens_with_prefix("app").collect();
        assert_eq!(hits, vec!["apple", "application"]);
    }
}
