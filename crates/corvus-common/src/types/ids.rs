//! Core identifier types for CorvusDB.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stream identifier - distinguishes pipelined in-flight calls on one
/// connection.
///
/// Stream ids are connection-scoped, not globally unique. An id may be
/// reused only after the prior call carrying it has fully completed.
///
/// # Example
///
/// ```rust
/// use corvus_common::types::StreamId;
///
/// let stream = StreamId::new(5);
/// assert_eq!(stream.as_u16(), 5);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StreamId(u16);

impl StreamId {
    /// Creates a new `StreamId` from a raw u16 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for StreamId {
    #[inline]
    fn from(id: u16) -> Self {
        Self::new(id)
    }
}

impl From<StreamId> for u16 {
    #[inline]
    fn from(id: StreamId) -> Self {
        id.0
    }
}

/// Session identifier - uniquely identifies a logical session.
///
/// A session is created once per connection and shared by every call on
/// that connection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new `SessionId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Connection identifier - uniquely identifies a physical connection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id() {
        let id = StreamId::new(7);
        assert_eq!(id.as_u16(), 7);
        assert_eq!(id, StreamId::from(7u16));
        assert_eq!(u16::from(id), 7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId::new(3).to_string(), "session_3");
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(9).to_string(), "conn_9");
    }
}
