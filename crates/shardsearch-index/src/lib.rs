//! Sharded inverted index, document repository, and BM25 scoring (§4.3/§4.4).

pub mod bm25;
pub mod error;
pub mod repository;
pub mod shard;
pub mod sharded;
pub mod token;

pub use bm25::{Bm25Scorer, DEFAULT_B, DEFAULT_K1};
pub use error::{Error, Result};
pub use repository::{DocumentRepository, InternalId, SaveOutcome};
pub use shard::{SerializedShard, Shard};
pub use sharded::{mix32, SerializedShardedIndex, ShardedInvertedIndex};
pub use token::{canonical_value_string, exact_token, field_token};
