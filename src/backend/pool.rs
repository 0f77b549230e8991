//! Server pool: ordered servers, the shared rotation cursor, and session affinity.

use crate::backend::Server;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Default lifetime of an idle sticky session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Errors building a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("server pool must contain at least one server")]
    Empty,
}

/// A fixed, ordered set of servers shared by every request.
#[derive(Debug)]
pub struct ServerPool {
    servers: Vec<Arc<Server>>,
    /// Rotation cursor; the logical position is `cursor % servers.len()`.
    cursor: AtomicUsize,
    session_ttl: Duration,
}

impl ServerPool {
    /// Build a pool. Fails if `servers` is empty.
    pub fn new(servers: Vec<Server>, session_ttl: Duration) -> Result<Self, PoolError> {
        if servers.is_empty() {
            return Err(PoolError::Empty);
        }

        Ok(Self {
            servers: servers.into_iter().map(Arc::new).collect(),
            cursor: AtomicUsize::new(0),
            session_ttl,
        })
    }

    /// All servers in pool order.
    pub fn servers(&self) -> &[Arc<Server>] {
        &self.servers
    }

    /// Server at `index`, which must be below `len()`.
    pub fn server(&self, index: usize) -> &Arc<Server> {
        &self.servers[index]
    }

    /// Number of servers, fixed at construction.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Always false; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Idle time after which a sticky session expires.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Atomically advance the cursor and return the new logical position.
    pub fn advance_cursor(&self) -> usize {
        let previous = self.cursor.fetch_add(1, Ordering::AcqRel);
        previous.wrapping_add(1) % self.servers.len()
    }

    /// Logical position of the cursor, without advancing it.
    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::Acquire) % self.servers.len()
    }

    /// Overwrite the cursor so the next advance starts after `index`.
    pub fn store_cursor(&self, index: usize) {
        self.cursor.store(index, Ordering::Release);
    }

    /// Server the client is bound to, if any.
    ///
    /// Runs garbage collection first, then scans in pool order. A hit refreshes
    /// the binding.
    pub fn find_sticky_server(&self, client_id: &str) -> Option<Arc<Server>> {
        self.find_sticky_server_at(client_id, Instant::now())
    }

    /// [`find_sticky_server`](Self::find_sticky_server) with an explicit clock reading.
    pub fn find_sticky_server_at(&self, client_id: &str, now: Instant) -> Option<Arc<Server>> {
        self.collect_expired_sessions_at(now);

        self.servers
            .iter()
            .find(|server| server.sessions().refresh(client_id, now))
            .cloned()
    }

    /// Bind `client_id` to `server` as of now.
    pub fn bind_session(&self, server: &Server, client_id: &str) {
        server.sessions().bind(client_id, Instant::now());
    }

    /// Purge sessions of dead servers and expired sessions of live ones.
    pub fn collect_expired_sessions(&self) {
        self.collect_expired_sessions_at(Instant::now());
    }

    /// [`collect_expired_sessions`](Self::collect_expired_sessions) with an explicit
    /// clock reading.
    pub fn collect_expired_sessions_at(&self, now: Instant) {
        for server in &self.servers {
            if !server.is_alive() {
                if !server.sessions().is_empty() {
                    debug!(server = %server.address(), "dropping sessions of dead server");
                    server.sessions().clear();
                }
                continue;
            }

            let expired = server.sessions().remove_expired(self.session_ttl, now);
            if expired > 0 {
                debug!(server = %server.address(), expired, "expired sticky sessions");
            }
        }
    }

    /// Total number of live bindings across the pool.
    pub fn session_count(&self) -> usize {
        self.servers.iter().map(|s| s.session_count()).sum()
    }
}
