use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::repository::InternalId;
use crate::shard::{SerializedShard, Shard};

/// 32-bit finalizer mix (FNV-1a fold followed by the murmur3 `fmix32`
/// avalanche) used to hash-partition tokens across shards. Any good
/// integer mixer works here; this one is simple, dependency-free, and
/// deterministic across runs and platforms.
pub fn mix32(bytes: &[u8]) -> u32 {
    let mut h: u32 = 0x811c9dc5;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Hash-partitions tokens across `num_shards` independent [`Shard`]s
/// (§4.3). The single-shard case bypasses hashing entirely and dispatches
/// directly.
pub struct ShardedInvertedIndex {
    num_shards: usize,
    shards: Vec<Shard>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedShardedIndex {
    pub num_shards: usize,
    pub shards: Vec<SerializedShard>,
}

impl ShardedInvertedIndex {
    pub fn new(num_shards: usize) -> Result<Self> {
        if num_shards == 0 {
            return Err(Error::InvalidParameter("numShards must be >= 1".into()));
        }
        Ok(ShardedInvertedIndex { num_shards, shards: (0..num_shards).map(|_| Shard::new()).collect() })
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    pub fn shard_of(&self, token: &str) -> usize {
        if self.num_shards == 1 {
            return 0;
        }
        (mix32(token.as_bytes()) as usize) % self.num_shards
    }

    pub fn add_token(&mut self, token: &str, doc_id: InternalId, position: u32) {
        let idx = self.shard_of(token);
        self.shards[idx].add_token(token, doc_id, position);
    }

    /// Broadcasts to every shard: a document's tokens may have hashed into
    /// any of them.
    pub fn delete_document(&mut self, doc_id: InternalId) {
        for shard in &mut self.shards {
            shard.delete_document(doc_id);
        }
    }

    pub fn get_posting(&self, token: &str) -> BTreeMap<InternalId, Vec<u32>> {
        self.shards[self.shard_of(token)].get_posting(token)
    }

    pub fn term_frequency(&self, token: &str, doc_id: InternalId) -> usize {
        self.shards[self.shard_of(token)].term_frequency(token, doc_id)
    }

    pub fn document_frequency(&self, token: &str) -> usize {
        self.shards[self.shard_of(token)].document_frequency(token)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.shards[self.shard_of(token)].contains_token(token)
    }

    /// Prefix scan must visit every shard: a token's shard is determined by
    /// its full hash, so tokens sharing `prefix` can land anywhere.
    pub fn tokens_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.shards.iter().flat_map(|s| s.tokens_with_prefix(prefix)).collect()
    }

    pub fn all_tokens(&self) -> Vec<&str> {
        self.shards.iter().flat_map(|s| s.all_tokens()).collect()
    }

    pub fn serialize(&self) -> SerializedShardedIndex {
        SerializedShardedIndex {
            num_shards: self.num_shards,
            shards: self.shards.iter().map(|s| s.serialize()).collect(),
        }
    }

    pub fn deserialize(serialized: SerializedShardedIndex) -> Self {
        ShardedInvertedIndex {
            num_shards: serialized.num_shards,
            shards: serialized.shards.into_iter().map(Shard::deserialize).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_shards() {
        assert!(ShardedInvertedIndex::new(0).is_err());
    }

    #[test]
    fn single_shard_bypasses_hashing() {
        let idx = ShardedInvertedIndex::new(1).unwrap();
        assert_eq!(idx.shard_of("anything"), 0);
    }

    #[test]
    fn writes_are_queryable_regardless_of_shard_count() {
        let mut idx = ShardedInvertedIndex::new(4).unwrap();
        idx.add_token("title:hello", 1, 0);
        idx.add_token("title:world", 1, 1);
        assert_eq!(idx.term_frequency("title:hello", 1), 1);
        assert_eq!(idx.document_frequency("title:hello"), 1);
    }

    #[test]
    fn delete_document_broadcasts_to_all_shards() {
        let mut idx = ShardedInvertedIndex::new(8).unwrap();
        for i in 0..50 {
            idx.add_token(&format!("token{i}"), 1, 0);
        }
        idx.delete_document(1);
        for i in 0..50 {
            assert_eq!(idx.document_frequency(&format!("token{i}")), 0);
        }
    }

    #[test]
    fn serialize_round_trip_preserves_observable_state() {
        let mut idx = ShardedInvertedIndex::new(3).unwrap();
        idx.add_token("a", 1, 0);
        idx.add_token("b", 2, 3);
        let serialized = idx.serialize();
        let restored = ShardedInvertedIndex::deserialize(serialized);
        assert_eq!(restored.term_frequency("a", 1), 1);
        assert_eq!(restored.term_frequency("b", 2), 1);
        assert_eq!(restored.num_shards(), 3);
    }

    #[test]
    fn mix32_is_deterministic() {
        assert_eq!(mix32(b"hello"), mix32(b"hello"));
        assert_ne!(mix32(b"hello"), mix32(b"world"));
    }
}
