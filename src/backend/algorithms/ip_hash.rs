//! IP hash load balancing algorithm.

use super::{LoadBalancer, first_alive_from};
use crate::backend::{Server, ServerPool};
use std::sync::Arc;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// IP hash load balancer.
///
/// Consistently routes a client identifier to the same server while the pool's
/// liveness is unchanged. If the hashed server is dead, the next live server in
/// pool order is used. The cursor is never touched.
pub struct IpHash;

impl IpHash {
    /// Create a new IP hash load balancer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for IpHash {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for IpHash {
    fn pick(&self, pool: &ServerPool, client_id: &str) -> Option<Arc<Server>> {
        let start = hash_client(client_id) as usize % pool.len();
        first_alive_from(pool, start).map(|index| Arc::clone(pool.server(index)))
    }

    fn name(&self) -> &'static str {
        "ip-hash"
    }
}

/// 32-bit FNV-1a over the client identifier.
pub fn hash_client(client_id: &str) -> u32 {
    client_id.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
