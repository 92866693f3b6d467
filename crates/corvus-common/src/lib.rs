//! # corvus-common
//!
//! Common types, errors, and constants for CorvusDB.
//!
//! This crate provides the foundational pieces shared by the CorvusDB
//! query front end:
//!
//! - **Types**: Core identifiers (`StreamId`, `SessionId`, `ConnectionId`)
//! - **Errors**: Unified error handling with `CorvusError`
//! - **Constants**: Protocol-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use corvus_common::types::{ConnectionId, StreamId};
//! use corvus_common::error::CorvusResult;
//!
//! fn example() -> CorvusResult<()> {
//!     let conn = ConnectionId::new(1);
//!     let stream = StreamId::new(5);
//!     assert_ne!(conn.as_u64(), u64::from(stream.as_u16()));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{CorvusError, CorvusResult, ErrorCode};
pub use types::{ConnectionId, SessionId, StreamId};
