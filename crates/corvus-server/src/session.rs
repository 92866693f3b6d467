//! Per-connection session state.
//!
//! A session is created once per connection and referenced, never copied,
//! by every call on that connection, so keyspace changes made by one call
//! are visible to the calls that follow it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use corvus_common::types::SessionId;
use parking_lot::RwLock;

/// Session-scoped state shared across the calls of one connection.
///
/// Mutation is serialized by a lock scoped to the session fields only;
/// statement execution on a connection never mutates the session from two
/// calls concurrently.
pub struct Session {
    id: SessionId,
    keyspace: RwLock<Option<String>>,
    created_at: Instant,
    statement_count: AtomicU64,
}

impl Session {
    /// Creates a new session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            keyspace: RwLock::new(None),
            created_at: Instant::now(),
            statement_count: AtomicU64::new(0),
        }
    }

    /// Returns the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current keyspace, if one has been set.
    pub fn current_keyspace(&self) -> Option<String> {
        self.keyspace.read().clone()
    }

    /// Sets the current keyspace.
    pub fn set_keyspace(&self, keyspace: impl Into<String>) {
        *self.keyspace.write() = Some(keyspace.into());
    }

    /// Returns session uptime.
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Returns the number of statements executed on this session.
    pub fn statement_count(&self) -> u64 {
        self.statement_count.load(Ordering::Relaxed)
    }

    /// Records one executed statement.
    pub fn record_statement(&self) {
        self.statement_count.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("keyspace", &self.current_keyspace())
            .field("statement_count", &self.statement_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_keyspace_visibility() {
        let session = Arc::new(Session::new(SessionId::new(1)));
        assert_eq!(session.current_keyspace(), None);

        // A keyspace change made through one handle is visible through
        // every other handle to the same session.
        let other = Arc::clone(&session);
        session.set_keyspace("analytics");
        assert_eq!(other.current_keyspace(), Some("analytics".to_string()));
    }

    #[test]
    fn test_statement_count() {
        let session = Session::new(SessionId::new(2));
        session.record_statement();
        session.record_statement();
        assert_eq!(session.statement_count(), 2);
    }
}
