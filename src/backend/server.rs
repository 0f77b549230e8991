//! A single upstream server.

use crate::backend::SessionTable;
use std::sync::atomic::{AtomicBool, Ordering};

/// One backend target.
///
/// The address and weight are fixed at construction. Liveness is an atomic flag
/// written by the health checker and read by every routing decision.
#[derive(Debug)]
pub struct Server {
    /// `host:port` of the server.
    address: String,
    /// Relative capacity used by weight-aware strategies.
    weight: u32,
    /// Result of the most recent health probe.
    alive: AtomicBool,
    /// Clients currently bound to this server.
    sessions: SessionTable,
}

impl Server {
    /// Create a server that starts out alive.
    pub fn new(address: impl Into<String>, weight: u32) -> Self {
        Self {
            address: address.into(),
            weight,
            alive: AtomicBool::new(true),
            sessions: SessionTable::new(),
        }
    }

    /// The `host:port` of this server.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Relative capacity for weight-aware strategies; may be 0.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Whether the last probe found the server alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Set liveness, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::AcqRel)
    }

    /// Sticky-session table for this server.
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Number of clients currently bound here.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
