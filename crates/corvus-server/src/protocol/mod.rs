//! Frame, call, and connection handling.
//!
//! Per-call state machine:
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  bytes ──────▶  │ Receiving (connection buffer) │
//!                 └──────────────┬───────────────┘
//!                                ▼
//!                            ┌────────┐
//!                            │ Parsed │ call id extracted, body
//!                            └───┬────┘ decompressed and decoded
//!                                ▼
//!                          ┌───────────┐
//!                ┌─────────│ Executing │─────────┐
//!                ▼         └───────────┘         ▼
//!          ┌───────────┐                   ┌────────────┐
//!          │ Suspended │──── resume ──────▶│ Responding │
//!          └───────────┘                   └─────┬──────┘
//!                                                ▼
//!                                            ┌──────┐
//!                                            │ Done │
//!                                            └──────┘
//! ```
//!
//! Frame extraction is sequential per connection; once parsed, calls
//! progress concurrently and may complete out of order. Responses are
//! routed by stream id, never by completion order.

mod call;
mod compression;
mod connection;
mod request;
mod response;

/// Frame extraction and encoding.
pub mod frame;

pub use call::{CallState, InboundCall, ResumeHandle};
pub use compression::CompressionScheme;
pub use connection::ConnectionContext;
pub use frame::{FrameHeader, Opcode, FLAG_COMPRESSED, HEADER_SIZE, PROTOCOL_VERSION};
pub use request::Request;
pub use response::{Outbox, Response};
