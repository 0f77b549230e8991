//! Load balancing algorithms.

mod ip_hash;
mod least_conn;
mod round_robin;
mod weighted;
mod weighted_least_conn;

pub use ip_hash::{IpHash, hash_client};
pub use least_conn::LeastSessions;
pub use round_robin::RoundRobin;
pub use weighted::WeightedRoundRobin;
pub use weighted_least_conn::WeightedLeastSessions;

use crate::backend::{Server, ServerPool};
use crate::config::Strategy;
use std::sync::Arc;
use thiserror::Error;

/// Errors building a load balancer.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    #[error("strategy '{0}' is not implemented")]
    Unimplemented(Strategy),
}

/// Trait for load balancing algorithms.
pub trait LoadBalancer: Send + Sync {
    /// Choose a server for a client with no live sticky binding.
    ///
    /// # Arguments
    ///
    /// * `pool` - The server pool, including dead servers
    /// * `client_id` - Client identifier (used for IP hash)
    ///
    /// # Returns
    ///
    /// A live server, or None if every server is dead.
    fn pick(&self, pool: &ServerPool, client_id: &str) -> Option<Arc<Server>>;

    /// Configuration name of the algorithm.
    fn name(&self) -> &'static str;

    /// Select the server for a request from `client_id`.
    ///
    /// An existing sticky binding always wins and is refreshed. Otherwise the
    /// algorithm picks a server and the client is bound to it.
    fn select(&self, pool: &ServerPool, client_id: &str) -> Option<Arc<Server>> {
        if let Some(server) = pool.find_sticky_server(client_id) {
            return Some(server);
        }

        let server = self.pick(pool, client_id)?;
        pool.bind_session(&server, client_id);
        Some(server)
    }
}

/// Build the balancer for a configured strategy.
pub fn create_load_balancer(strategy: Strategy) -> Result<Arc<dyn LoadBalancer>, AlgorithmError> {
    let lb: Arc<dyn LoadBalancer> = match strategy {
        Strategy::RoundRobin => Arc::new(RoundRobin::new()),
        Strategy::WeightedRoundRobin => Arc::new(WeightedRoundRobin::new()),
        Strategy::IpHash => Arc::new(IpHash::new()),
        Strategy::LeastConnection => Arc::new(LeastSessions::new()),
        Strategy::WeightedLeastConnection => Arc::new(WeightedLeastSessions::new()),
        Strategy::WeightedResponseTime => return Err(AlgorithmError::Unimplemented(strategy)),
    };
    Ok(lb)
}

/// Index of the first live server at or after `start`, wrapping once around the pool.
fn first_alive_from(pool: &ServerPool, start: usize) -> Option<usize> {
    let len = pool.len();
    (0..len)
        .map(|offset| (start + offset) % len)
        .find(|&index| pool.server(index).is_alive())
}
