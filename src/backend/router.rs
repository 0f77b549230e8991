//! Backend router: the pool plus the active distribution strategy.

use crate::backend::algorithms::{AlgorithmError, LoadBalancer, create_load_balancer};
use crate::backend::{PoolError, Server, ServerPool};
use crate::config::{Config, ServerConfig, Strategy};
use std::cmp::Reverse;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors building a router from configuration.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),
}

/// Per-request selection failure.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("no server available")]
    NoServerAvailable,
}

/// Routes requests to backend servers based on the configured strategy.
pub struct BackendRouter {
    /// Shared server pool.
    pool: Arc<ServerPool>,
    /// The load balancer algorithm.
    algorithm: Arc<dyn LoadBalancer>,
}

impl BackendRouter {
    /// Create a router over an existing pool.
    pub fn new(pool: Arc<ServerPool>, algorithm: Arc<dyn LoadBalancer>) -> Self {
        Self { pool, algorithm }
    }

    /// Create a router from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, RouterError> {
        Self::build(&config.servers, config.strategy, config.sticky_sessions.ttl)
    }

    /// Create a router from a server list and a strategy.
    ///
    /// For weighted round-robin the servers are ordered by descending weight,
    /// keeping configuration order among equal weights.
    pub fn build(
        servers: &[ServerConfig],
        strategy: Strategy,
        session_ttl: Duration,
    ) -> Result<Self, RouterError> {
        let algorithm = create_load_balancer(strategy)?;

        let mut servers: Vec<Server> = servers
            .iter()
            .map(|s| Server::new(s.host.clone(), s.weight))
            .collect();

        if strategy == Strategy::WeightedRoundRobin {
            servers.sort_by_key(|s| Reverse(s.weight()));
        }

        let pool = ServerPool::new(servers, session_ttl)?;

        Ok(Self::new(Arc::new(pool), algorithm))
    }

    /// Select a server for a request from `client_addr`.
    pub fn select(&self, client_addr: SocketAddr) -> Result<Arc<Server>, SelectError> {
        self.select_client(&client_addr.to_string())
    }

    /// Select a server for an arbitrary client identifier.
    pub fn select_client(&self, client_id: &str) -> Result<Arc<Server>, SelectError> {
        match self.algorithm.select(&self.pool, client_id) {
            Some(server) => {
                debug!(
                    client = client_id,
                    server = %server.address(),
                    algorithm = self.algorithm.name(),
                    "selected backend server"
                );
                Ok(server)
            }
            None => {
                warn!(
                    client = client_id,
                    algorithm = self.algorithm.name(),
                    "no live servers available"
                );
                Err(SelectError::NoServerAvailable)
            }
        }
    }

    /// The shared server pool.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Name of the active algorithm.
    pub fn algorithm(&self) -> &'static str {
        self.algorithm.name()
    }
}
