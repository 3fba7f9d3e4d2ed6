use serde::Serialize;

/// Reported by [`crate::coordinator::Coordinator::health`] (§4.6): a
/// `queue_len` past `watermark` means the pool is falling behind, not that
/// anything has been dropped — tasks are never silently discarded.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct HealthReport {
    pub queue_len: usize,
    pub watermark: usize,
    pub workers: usize,
}

impl HealthReport {
    pub fn is_backpressured(&self) -> bool {
        self.queue_len > self.watermark
    }
}
