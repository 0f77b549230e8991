//! Server pool, sticky sessions, and load balancing algorithms.

pub mod algorithms;
mod pool;
mod router;
mod server;
mod session;

pub use pool::{DEFAULT_SESSION_TTL, PoolError, ServerPool};
pub use router::{BackendRouter, RouterError, SelectError};
pub use server::Server;
pub use session::SessionTable;
