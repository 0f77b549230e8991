//! Weighted least-sessions load balancing algorithm.

use super::LoadBalancer;
use crate::backend::{Server, ServerPool};
use std::cmp::Reverse;
use std::sync::Arc;

/// Weighted least-sessions load balancer.
///
/// Among live servers sharing the lowest sticky-session count, picks the one
/// with the highest weight. Remaining ties go to the earliest server in pool
/// order.
pub struct WeightedLeastSessions;

impl WeightedLeastSessions {
    /// Create a new weighted least-sessions load balancer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeightedLeastSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for WeightedLeastSessions {
    fn pick(&self, pool: &ServerPool, _client_id: &str) -> Option<Arc<Server>> {
        let live: Vec<(usize, usize, &Arc<Server>)> = pool
            .servers()
            .iter()
            .enumerate()
            .filter(|(_, server)| server.is_alive())
            .map(|(index, server)| (index, server.session_count(), server))
            .collect();

        let min_sessions = live.iter().map(|(_, count, _)| *count).min()?;

        live.into_iter()
            .filter(|(_, count, _)| *count == min_sessions)
            .min_by_key(|(index, _, server)| (Reverse(server.weight()), *index))
            .map(|(_, _, server)| Arc::clone(server))
    }

    fn name(&self) -> &'static str {
        "weighted-least-connection"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{client, pool_with_weights};
    use super::*;

    #[test]
    fn test_highest_weight_in_least_loaded_group() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[1, 5, 3]);

        assert_eq!(lb.pick(&pool, "a").unwrap().address(), "127.0.0.1:8002");
    }

    #[test]
    fn test_fewer_sessions_beats_weight() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[1, 5, 3]);
        pool.bind_session(pool.server(1), "x");
        pool.bind_session(pool.server(2), "y");

        assert_eq!(lb.pick(&pool, "a").unwrap().address(), "127.0.0.1:8001");
    }

    #[test]
    fn test_weight_tie_broken_by_pool_order() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[2, 4, 4]);

        assert_eq!(lb.pick(&pool, "a").unwrap().address(), "127.0.0.1:8002");
    }

    #[test]
    fn test_zero_weight_loses_ties() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[0, 1]);

        assert_eq!(lb.pick(&pool, "a").unwrap().address(), "127.0.0.1:8002");

        // Still chosen once it is the only least-loaded server
        pool.bind_session(pool.server(1), "x");
        assert_eq!(lb.pick(&pool, "b").unwrap().address(), "127.0.0.1:8001");
    }

    #[test]
    fn test_dead_servers_ignored() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[1, 5, 3]);
        pool.server(1).set_alive(false);

        assert_eq!(lb.pick(&pool, "a").unwrap().address(), "127.0.0.1:8003");
    }

    #[test]
    fn test_rotation_by_weight_then_load() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[2, 1]);

        let got: Vec<String> = (0..4)
            .map(|i| lb.select(&pool, &client(i)).unwrap().address().to_string())
            .collect();
        assert_eq!(
            got,
            vec![
                "127.0.0.1:8001",
                "127.0.0.1:8002",
                "127.0.0.1:8001",
                "127.0.0.1:8002",
            ]
        );
    }

    #[test]
    fn test_all_dead() {
        let lb = WeightedLeastSessions::new();
        let pool = pool_with_weights(&[1, 2]);
        pool.server(0).set_alive(false);
        pool.server(1).set_alive(false);
        assert!(lb.pick(&pool, "a").is_none());
    }
}
