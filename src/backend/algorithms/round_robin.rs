//! Round-robin load balancing algorithm.

use super::{LoadBalancer, first_alive_from};
use crate::backend::{Server, ServerPool};
use std::sync::Arc;

/// Round-robin load balancer.
///
/// Advances the pool cursor on every pick and skips dead servers. When a dead
/// server is skipped, the cursor is moved to the server actually chosen so the
/// next pick starts past it.
pub struct RoundRobin;

impl RoundRobin {
    /// Create a new round-robin load balancer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for RoundRobin {
    fn pick(&self, pool: &ServerPool, _client_id: &str) -> Option<Arc<Server>> {
        scan_and_advance(pool).map(|index| Arc::clone(pool.server(index)))
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Advance the cursor and return the first live server from there.
pub(super) fn scan_and_advance(pool: &ServerPool) -> Option<usize> {
    let next = pool.advance_cursor();
    let index = first_alive_from(pool, next)?;
    if index != next {
        pool.store_cursor(index);
    }
    Some(index)
}
