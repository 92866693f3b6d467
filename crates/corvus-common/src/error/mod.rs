//! Error handling for CorvusDB.
//!
//! This module provides a unified error type and result alias used
//! across the CorvusDB front end.

mod frontend;

pub use frontend::{CorvusError, ErrorCode};

/// Result type alias for CorvusDB operations.
pub type CorvusResult<T> = std::result::Result<T, CorvusError>;
