//! Weighted round-robin load balancing algorithm.

use super::LoadBalancer;
use super::round_robin::scan_and_advance;
use crate::backend::{Server, ServerPool};
use parking_lot::Mutex;
use std::sync::Arc;

/// Weighted round-robin load balancer.
///
/// Keeps handing new clients to the server under the cursor until it has
/// received `weight` consecutive assignments, then moves on round-robin style.
/// The pool must be sorted by descending weight for the shares to come out
/// proportional.
pub struct WeightedRoundRobin {
    /// Consecutive assignments made to the server at the cursor.
    sent_to_current: Mutex<u32>,
}

impl WeightedRoundRobin {
    /// Create a new weighted round-robin load balancer.
    pub fn new() -> Self {
        Self {
            sent_to_current: Mutex::new(0),
        }
    }
}

impl Default for WeightedRoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn pick(&self, pool: &ServerPool, _client_id: &str) -> Option<Arc<Server>> {
        // Held across the whole decision so the read-check-increment is not torn
        let mut sent = self.sent_to_current.lock();

        let current = pool.server(pool.current_index());
        if current.is_alive() && *sent < current.weight() {
            *sent += 1;
            return Some(Arc::clone(current));
        }

        *sent = 0;
        let index = scan_and_advance(pool)?;
        // The fallback pick is the first assignment to the new current server
        *sent = 1;
        Some(Arc::clone(pool.server(index)))
    }

    fn name(&self) -> &'static str {
        "weighted-round-robin"
    }
}
