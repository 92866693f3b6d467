//! Logical and physical type tags.
//!
//! Every expression node and column carries a pair of type descriptors:
//! the *logical* type visible to CQL clients and the *physical* type used
//! by the storage layer to encode the column. The two axes are
//! independent: a boolean predicate result and a boolean stored column
//! share the logical type `Boolean` but need not share a physical
//! encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The CQL-visible data type of an expression or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Boolean type.
    Boolean,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit floating point.
    Double,
    /// UTF-8 text.
    Text,
    /// Binary data.
    Blob,
    /// IPv4 or IPv6 address.
    Inet,
    /// Millisecond-precision timestamp.
    Timestamp,
    /// UUID type.
    Uuid,
}

impl LogicalType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, LogicalType::BigInt | LogicalType::Double)
    }

    /// Returns the wire tag for this type.
    pub fn as_u8(self) -> u8 {
        match self {
            LogicalType::Boolean => 0,
            LogicalType::BigInt => 1,
            LogicalType::Double => 2,
            LogicalType::Text => 3,
            LogicalType::Blob => 4,
            LogicalType::Inet => 5,
            LogicalType::Timestamp => 6,
            LogicalType::Uuid => 7,
        }
    }

    /// Converts a wire tag back into a logical type.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(LogicalType::Boolean),
            1 => Some(LogicalType::BigInt),
            2 => Some(LogicalType::Double),
            3 => Some(LogicalType::Text),
            4 => Some(LogicalType::Blob),
            5 => Some(LogicalType::Inet),
            6 => Some(LogicalType::Timestamp),
            7 => Some(LogicalType::Uuid),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Boolean => write!(f, "BOOLEAN"),
            LogicalType::BigInt => write!(f, "BIGINT"),
            LogicalType::Double => write!(f, "DOUBLE"),
            LogicalType::Text => write!(f, "TEXT"),
            LogicalType::Blob => write!(f, "BLOB"),
            LogicalType::Inet => write!(f, "INET"),
            LogicalType::Timestamp => write!(f, "TIMESTAMP"),
            LogicalType::Uuid => write!(f, "UUID"),
        }
    }
}

/// The storage-column encoding type backing a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalType {
    /// Single-byte boolean.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// IEEE 754 double.
    Float64,
    /// Length-prefixed UTF-8 string.
    String,
    /// Length-prefixed raw bytes.
    Binary,
}

impl PhysicalType {
    /// Returns the wire tag for this encoding.
    pub fn as_u8(self) -> u8 {
        match self {
            PhysicalType::Bool => 0,
            PhysicalType::Int64 => 1,
            PhysicalType::Float64 => 2,
            PhysicalType::String => 3,
            PhysicalType::Binary => 4,
        }
    }

    /// Converts a wire tag back into a physical type.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(PhysicalType::Bool),
            1 => Some(PhysicalType::Int64),
            2 => Some(PhysicalType::Float64),
            3 => Some(PhysicalType::String),
            4 => Some(PhysicalType::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalType::Bool => write!(f, "bool"),
            PhysicalType::Int64 => write!(f, "int64"),
            PhysicalType::Float64 => write!(f, "float64"),
            PhysicalType::String => write!(f, "string"),
            PhysicalType::Binary => write!(f, "binary"),
        }
    }
}

/// The two-level type descriptor attached to expression nodes and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypePair {
    /// The CQL-visible type.
    pub logical: LogicalType,
    /// The storage encoding.
    pub physical: PhysicalType,
}

impl TypePair {
    /// The type pair of every predicate expression.
    pub const BOOLEAN: Self = Self {
        logical: LogicalType::Boolean,
        physical: PhysicalType::Bool,
    };

    /// Creates a type pair from explicit axes.
    pub const fn new(logical: LogicalType, physical: PhysicalType) -> Self {
        Self { logical, physical }
    }

    /// Creates a type pair using the default storage encoding for a
    /// logical type.
    pub const fn of(logical: LogicalType) -> Self {
        let physical = match logical {
            LogicalType::Boolean => PhysicalType::Bool,
            LogicalType::BigInt | LogicalType::Timestamp => PhysicalType::Int64,
            LogicalType::Double => PhysicalType::Float64,
            LogicalType::Text => PhysicalType::String,
            LogicalType::Blob | LogicalType::Inet | LogicalType::Uuid => PhysicalType::Binary,
        };
        Self { logical, physical }
    }
}

impl fmt::Display for TypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.logical, self.physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encodings() {
        assert_eq!(TypePair::of(LogicalType::Boolean).physical, PhysicalType::Bool);
        assert_eq!(TypePair::of(LogicalType::BigInt).physical, PhysicalType::Int64);
        assert_eq!(TypePair::of(LogicalType::Text).physical, PhysicalType::String);
        assert_eq!(TypePair::of(LogicalType::Inet).physical, PhysicalType::Binary);
    }

    #[test]
    fn test_axes_are_independent() {
        // A boolean column may be stored as an int64 bitmap entry; the
        // logical type is unaffected.
        let pair = TypePair::new(LogicalType::Boolean, PhysicalType::Int64);
        assert_eq!(pair.logical, LogicalType::Boolean);
        assert_eq!(pair.physical, PhysicalType::Int64);
        assert_ne!(pair, TypePair::BOOLEAN);
    }

    #[test]
    fn test_tag_round_trip() {
        for lt in [
            LogicalType::Boolean,
            LogicalType::BigInt,
            LogicalType::Double,
            LogicalType::Text,
            LogicalType::Blob,
            LogicalType::Inet,
            LogicalType::Timestamp,
            LogicalType::Uuid,
        ] {
            assert_eq!(LogicalType::from_u8(lt.as_u8()), Some(lt));
        }
        assert_eq!(LogicalType::from_u8(200), None);
        assert_eq!(PhysicalType::from_u8(PhysicalType::Binary.as_u8()), Some(PhysicalType::Binary));
        assert_eq!(PhysicalType::from_u8(99), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(LogicalType::BigInt.to_string(), "BIGINT");
        assert_eq!(TypePair::BOOLEAN.to_string(), "BOOLEAN/bool");
    }
}
