//! Protocol-wide constants for CorvusDB.

// =============================================================================
// Frame Limits
// =============================================================================

/// Maximum frame size in bytes (16 MB).
///
/// A frame whose declared body length would push the total past this limit
/// is rejected as a protocol error and the connection is closed.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Initial capacity of a connection's receive buffer.
pub const RECV_BUFFER_CAPACITY: usize = 4 * 1024;

// =============================================================================
// Call Limits
// =============================================================================

/// Default maximum number of concurrently in-flight calls per connection.
///
/// Stream ids are 16-bit and connection-scoped; this bound keeps a
/// misbehaving client from parking an unbounded number of suspended calls.
pub const DEFAULT_MAX_INFLIGHT_CALLS: usize = 128;

/// Default number of rows the backend is asked to return per page.
pub const DEFAULT_PAGE_ROW_LIMIT: usize = 1024;
