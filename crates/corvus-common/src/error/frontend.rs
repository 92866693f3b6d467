//! Front-end error types.
//!
//! Provides error types for frame handling, semantic analysis, statement
//! execution, and call lifecycle management.

use std::fmt;
use thiserror::Error;

use crate::types::StreamId;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling, are stable
/// across versions, and are embedded verbatim in protocol error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// A suspended call was resumed more than once or after completion.
    ResumptionMisuse = 0x0002,

    // Protocol errors (0x0100 - 0x01FF)
    /// Frame could not be decoded.
    MalformedFrame = 0x0100,
    /// Frame exceeds the configured maximum length.
    FrameTooLarge = 0x0101,
    /// Protocol version is not supported.
    UnsupportedVersion = 0x0102,
    /// Requested compression scheme is not supported.
    UnsupportedCompression = 0x0103,
    /// Frame body does not match the negotiated compression scheme.
    CompressionMismatch = 0x0104,
    /// Stream id collides with a call still in flight.
    StreamIdInUse = 0x0105,
    /// The connection has been closed.
    ConnectionClosed = 0x0106,

    // Analysis errors (0x0200 - 0x02FF)
    /// A qualified name did not resolve to any visible column.
    NameResolution = 0x0200,
    /// A qualified name resolved to more than one visible column.
    AmbiguousReference = 0x0201,

    // Execution errors (0x0300 - 0x03FF)
    /// Statement execution failed.
    ExecutionFailed = 0x0300,

    // Serialization errors (0x0400 - 0x04FF)
    /// A value could not be serialized or deserialized as required.
    SerializationFailed = 0x0400,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Protocol",
            0x02 => "Analysis",
            0x03 => "Execution",
            0x04 => "Serialization",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for the CorvusDB front end.
///
/// Protocol errors are fatal to their connection; statement-level errors
/// (analysis, execution, serialization) produce an error response for the
/// offending call only and leave sibling in-flight calls untouched.
#[derive(Debug, Error)]
pub enum CorvusError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// A suspended call was resumed twice, or resumed after it completed.
    ///
    /// This is a lifecycle bug in the caller, not bad client input, and is
    /// reported rather than silently ignored.
    #[error("resumption misuse: {reason}")]
    ResumptionMisuse {
        /// What the caller did wrong.
        reason: String,
    },

    // ==========================================================================
    // Protocol Errors (connection-fatal)
    // ==========================================================================
    /// A frame could not be decoded.
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        /// Why decoding failed.
        reason: String,
    },

    /// A frame exceeds the configured maximum length.
    #[error("frame of {size} bytes exceeds maximum {max_size}")]
    FrameTooLarge {
        /// Declared total frame size.
        size: usize,
        /// Configured maximum.
        max_size: usize,
    },

    /// The frame's protocol version is not supported.
    #[error("unsupported protocol version {version:#04x}")]
    UnsupportedVersion {
        /// The version byte received.
        version: u8,
    },

    /// The client requested a compression scheme this server does not speak.
    #[error("unsupported compression scheme '{scheme}'")]
    UnsupportedCompression {
        /// The requested scheme name.
        scheme: String,
    },

    /// A frame body does not match the negotiated compression scheme.
    #[error("compression mismatch: {reason}")]
    CompressionMismatch {
        /// What was inconsistent.
        reason: String,
    },

    /// A frame reused a stream id while a call with that id is in flight.
    #[error("stream id {stream_id} is already in use by an in-flight call")]
    StreamIdInUse {
        /// The colliding stream id.
        stream_id: StreamId,
    },

    /// The connection has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    // ==========================================================================
    // Analysis Errors (statement-fatal)
    // ==========================================================================
    /// A qualified name did not resolve to any visible column.
    #[error("name '{name}' does not resolve to any column in scope")]
    NameResolution {
        /// The unresolved name.
        name: String,
    },

    /// A qualified name matched more than one visible column.
    #[error("reference '{name}' is ambiguous")]
    AmbiguousReference {
        /// The ambiguous name.
        name: String,
    },

    // ==========================================================================
    // Execution Errors (statement-fatal)
    // ==========================================================================
    /// Statement execution failed in the backend.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Reason for failure.
        reason: String,
    },

    // ==========================================================================
    // Serialization Errors (statement-fatal)
    // ==========================================================================
    /// A value could not be represented in its required wire form.
    #[error("serialization failed: {reason}")]
    SerializationFailed {
        /// What could not be represented.
        reason: String,
    },
}

impl CorvusError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::ResumptionMisuse { .. } => ErrorCode::ResumptionMisuse,
            Self::MalformedFrame { .. } => ErrorCode::MalformedFrame,
            Self::FrameTooLarge { .. } => ErrorCode::FrameTooLarge,
            Self::UnsupportedVersion { .. } => ErrorCode::UnsupportedVersion,
            Self::UnsupportedCompression { .. } => ErrorCode::UnsupportedCompression,
            Self::CompressionMismatch { .. } => ErrorCode::CompressionMismatch,
            Self::StreamIdInUse { .. } => ErrorCode::StreamIdInUse,
            Self::ConnectionClosed => ErrorCode::ConnectionClosed,
            Self::NameResolution { .. } => ErrorCode::NameResolution,
            Self::AmbiguousReference { .. } => ErrorCode::AmbiguousReference,
            Self::ExecutionFailed { .. } => ErrorCode::ExecutionFailed,
            Self::SerializationFailed { .. } => ErrorCode::SerializationFailed,
        }
    }

    /// Returns true if this error must close the whole connection.
    ///
    /// Statement-level errors only fail the offending call.
    #[must_use]
    pub const fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. }
                | Self::FrameTooLarge { .. }
                | Self::UnsupportedVersion { .. }
                | Self::UnsupportedCompression { .. }
                | Self::CompressionMismatch { .. }
                | Self::StreamIdInUse { .. }
                | Self::ConnectionClosed
        )
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an execution error.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::SerializationFailed {
            reason: reason.into(),
        }
    }

    /// Creates a malformed-frame error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }
}
