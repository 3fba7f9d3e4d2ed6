use std::collections::HashMap;

/// Per-worker logical clock (§4.6/§9): one counter per worker id, bumped
/// every time that worker's operations are appended to the log.
pub type VectorClock = HashMap<String, u64>;

/// `a` is strictly newer than `b` when it dominates on every worker and
/// strictly exceeds it on at least one. Neither newer nor older than `b`
/// means the two are concurrent — callers fall back to last-write-wins by
/// timestamp in that case.
pub fn is_newer(a: &VectorClock, b: &VectorClock) -> bool {
    let mut strictly_greater = false;
    let workers = a.keys().chain(b.keys());
    for worker in workers {
        let av = a.get(worker).copied().unwrap_or(0);
        let bv = b.get(worker).copied().unwrap_or(0);
        if av < bv {
            return false;
        }
        if av > bv {
            strictly_greater = true;
        }
    }
    strictly_greater
}

pub fn increment(clock: &mut VectorClock, worker: &str) {
    *clock.entry(worker.to_string()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominating_clock_is_newer() {
        let mut a = VectorClock::new();
        let mut b = VectorClock::new();
        a.insert("main".into(), 2);
        b.insert("main".into(), 1);
        assert!(is_newer(&a, &b));
        assert!(!is_newer(&b, &a));
    }

    #[test]
    fn concurrent_clocks_are_neither_newer() {
        let mut a = VectorClock::new();
        let mut b = VectorClock::new();
        a.insert("w1".into(), 2);
        a.insert("w2".into(), 0);
        b.insert("w1".into(), 0);
        b.insert("w2".into(), 2);
        assert!(!is_newer(&a, &b));
        assert!(!is_newer(&b, &a));
    }

    #[test]
    fn equal_clocks_are_neither_newer() {
        let mut a = VectorClock::new();
        a.insert("main".into(), 1);
        let b = a.clone();
        assert!(!is_newer(&a, &b));
    }
}
