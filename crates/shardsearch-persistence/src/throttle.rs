use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_secs(10);
const MAX_DELAY: Duration = Duration::from_secs(5);
const IMMEDIATE_THRESHOLD: u64 = 100;

/// Per-index throttle state (§4.7): coalesces overlapping snapshot triggers
/// into one flush, fired either immediately once `pendingDocs` crosses the
/// threshold, or after whichever of the minimum interval / max delay
/// elapses first.
#[derive(Debug)]
pub struct ThrottleState {
    pending_docs: u64,
    pending_since: Option<Instant>,
    last_snapshot: Option<Instant>,
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottleState {
    pub fn new() -> Self {
        ThrottleState { pending_docs: 0, pending_since: None, last_snapshot: None }
    }

    pub fn pending_docs(&self) -> u64 {
        self.pending_docs
    }

    pub fn record_write(&mut self, now: Instant) {
        self.pending_docs += 1;
        self.pending_since.get_or_insert(now);
    }

    /// Whether a snapshot should fire now, given the current instant.
    pub fn should_flush(&self, now: Instant) -> bool {
        if self.pending_docs == 0 {
            return false;
        }
        if self.pending_docs >= IMMEDIATE_THRESHOLD {
            return true;
        }
        let min_interval_elapsed = self.last_snapshot.map_or(true, |t| now.duration_since(t) >= MIN_INTERVAL);
        let max_delay_elapsed = self.pending_since.map_or(false, |t| now.duration_since(t) >= MAX_DELAY);
        min_interval_elapsed || max_delay_elapsed
    }

    /// Resets pending state after a flush actually ran.
    pub fn record_flush(&mut self, now: Instant) {
        self.pending_docs = 0;
        self.pending_since = None;
        self.last_snapshot = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_immediately_once_pending_threshold_crossed() {
        let mut state = ThrottleState::new();
        let now = Instant::now();
        for _ in 0..100 {
            state.record_write(now);
        }
        assert!(state.should_flush(now));
    }

    #[test]
    fn below_threshold_waits_for_max_delay() {
        let mut state = ThrottleState::new();
        let now = Instant::now();
        state.record_write(now);
        assert!(!state.should_flush(now), "a single pending write shouldn't flush instantly");
        let later = now + Duration::from_secs(6);
        assert!(state.should_flush(later), "max delay of 5s should have elapsed");
    }

    #[test]
    fn respects_minimum_interval_after_a_recent_flush() {
        let mut state = ThrottleState::new();
        let now = Instant::now();
        state.record_flush(now);
        state.record_write(now + Duration::from_secs(1));
        let still_too_soon = now + Duration::from_secs(2);
        assert!(!state.should_flush(still_too_soon));
        let after_min_interval = now + Duration::from_secs(11);
        assert!(state.should_flush(after_min_interval));
    }

    #[test]
    fn no_pending_writes_never_flushes() {
        let state = ThrottleState::new();
        assert!(!state.should_flush(Instant::now()));
    }
}
