//! On-disk snapshot layout, atomic writes, discovery/restore, and throttled
//! flush scheduling (§4.7).

pub mod error;
pub mod layout;
pub mod reader;
pub mod snapshot;
pub mod throttle;
pub mod writer;

pub use error::{Error, Result};
pub use layout::{discover_indices, shard_dirs, IndexPaths};
pub use reader::read_snapshot;
pub use snapshot::{GlobalMetadata, Snapshot, ShardMetadata};
pub use throttle::ThrottleState;
pub use writer::write_snapshot;
