//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{
    backend::{Backend, BackendSet},
    LoadBalancer,
};

/// Hands out backend slots in strict rotation from one shared counter.
///
/// The counter is advanced with a single `fetch_add`, so concurrent callers
/// each observe a distinct counter value and no increment is lost. The
/// counter wraps on overflow; only its residue modulo the set size matters.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next slot in a rotation over `len` entries.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(count % len)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server<'a>(&self, backends: &'a BackendSet) -> Option<&'a Backend> {
        // Health is not consulted here; unhealthy backends keep their turn.
        let index = self.next_index(backends.len())?;
        backends.get(index)
    }
}
