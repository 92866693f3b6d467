//! # corvus-server
//!
//! Wire-protocol call layer for CorvusDB.
//!
//! This crate turns bytes arriving on a connection into typed, resumable
//! units of execution and turns execution results back into framed
//! responses:
//!
//! - **Framing**: length-prefixed frame extraction tolerant of partial
//!   reads, with a hard size limit.
//! - **Compression**: per-connection negotiated body compression applied
//!   uniformly to every frame after startup.
//! - **Calls**: one state machine per inbound request
//!   (`Parsed → Executing → {Suspended | Responding} → Done`), pipelined
//!   per connection and routed by stream id.
//! - **Suspend/resume**: a call waiting on an asynchronous backend round
//!   trip parks a one-shot resumption handle and frees the processing
//!   thread; the handle may be invoked later from a different thread.
//! - **Sessions**: one logical session per connection, shared by every
//!   call on it, carrying the current keyspace.
//!
//! The surface toward the socket layer is deliberately small: feed bytes
//! in, learn how many were consumed, and drain ready-to-send buffers
//! keyed by stream id.
//!
//! ```ignore
//! let mut conn = ConnectionContext::new(ConnectionId::new(1), config, executor);
//! let consumed = conn.feed(&bytes)?;
//! for (stream_id, frame) in conn.take_responses() {
//!     // hand frame to the transport
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Protocol configuration.
pub mod config;

/// The statement-executor boundary.
pub mod executor;

/// Frame, call, and connection handling.
pub mod protocol;

/// Per-connection session state.
pub mod session;

pub use config::ProtocolConfig;
pub use executor::{ExecOutcome, StatementExecutor};
pub use protocol::{
    CallState, CompressionScheme, ConnectionContext, FrameHeader, InboundCall, Opcode, Request,
    Response, ResumeHandle,
};
pub use session::Session;
