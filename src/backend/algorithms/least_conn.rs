//! Least-sessions load balancing algorithm.

use super::LoadBalancer;
use crate::backend::{Server, ServerPool};
use std::sync::Arc;

/// Least-sessions load balancer.
///
/// Sends new clients to the live server with the fewest sticky sessions.
/// Breaks ties using pool order.
pub struct LeastSessions;

impl LeastSessions {
    /// Create a new least-sessions load balancer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for LeastSessions {
    fn pick(&self, pool: &ServerPool, _client_id: &str) -> Option<Arc<Server>> {
        let mut by_sessions: Vec<(usize, &Arc<Server>)> = pool
            .servers()
            .iter()
            .map(|server| (server.session_count(), server))
            .collect();
        // Stable, so equal counts keep pool order
        by_sessions.sort_by_key(|(count, _)| *count);

        by_sessions
            .into_iter()
            .find(|(_, server)| server.is_alive())
            .map(|(_, server)| Arc::clone(server))
    }

    fn name(&self) -> &'static str {
        "least-connection"
    }
}
