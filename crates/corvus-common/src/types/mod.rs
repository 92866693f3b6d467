//! Core types for CorvusDB.

mod ids;

pub use ids::{ConnectionId, SessionId, StreamId};
