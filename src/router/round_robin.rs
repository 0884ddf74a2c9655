use std::sync::atomic::{AtomicUsize, Ordering};

/// Strict rotation over a candidate list, independent of load. With two
/// candidates this is plain alternation.
#[derive(Debug, Default)]
pub struct RoundRobinRouter {
    counter: AtomicUsize,
}

impl RoundRobinRouter {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }

    pub fn select<'a, T>(&self, candidates: &'a [T]) -> Option<(usize, &'a T)> {
        if candidates.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some((idx, &candidates[idx]))
    }
}
