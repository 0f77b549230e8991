//! Per-server sticky-session table.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Client bindings owned by a single server.
///
/// Maps a client identifier to the instant it was last routed here. Every
/// operation is atomic per entry, so concurrent routing decisions and the
/// garbage-collection pass never observe a half-applied update.
#[derive(Debug, Default)]
pub struct SessionTable {
    entries: DashMap<String, Instant>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `client_id` to this server, stamped with `now`.
    pub fn bind(&self, client_id: &str, now: Instant) {
        self.entries.insert(client_id.to_string(), now);
    }

    /// Refresh the entry for `client_id` if present.
    ///
    /// Returns `false` when the client has no binding here.
    pub fn refresh(&self, client_id: &str, now: Instant) -> bool {
        match self.entries.get_mut(client_id) {
            Some(mut last_access) => {
                *last_access = now;
                true
            }
            None => false,
        }
    }

    /// Whether `client_id` is bound to this server.
    #[cfg(test)]
    pub(crate) fn contains(&self, client_id: &str) -> bool {
        self.entries.contains_key(client_id)
    }

    /// Last access instant recorded for `client_id`.
    #[cfg(test)]
    pub(crate) fn last_access(&self, client_id: &str) -> Option<Instant> {
        self.entries.get(client_id).map(|entry| *entry)
    }

    /// Drop entries idle for longer than `ttl` as of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_expired(&self, ttl: Duration, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, last_access| {
            last_access
                .checked_add(ttl)
                .is_none_or(|deadline| deadline >= now)
        });
        before.saturating_sub(self.entries.len())
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of bound clients.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no client is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
