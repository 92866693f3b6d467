//! Runtime CQL values.

use std::fmt;
use std::net::IpAddr;

use corvus_common::error::{CorvusError, CorvusResult};
use serde::{Deserialize, Serialize};

use crate::types::LogicalType;

/// Raw length of a serialized IPv4 address.
pub const INET_V4_SIZE: usize = 4;

/// Raw length of a serialized IPv6 address.
pub const INET_V6_SIZE: usize = 16;

/// A single cell value in a row block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CqlValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 64-bit integer value.
    BigInt(i64),
    /// 64-bit floating point value.
    Double(f64),
    /// Text value.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// IPv4 or IPv6 address.
    Inet(IpAddr),
}

impl CqlValue {
    /// Returns the logical type of this value, `None` for NULL.
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            CqlValue::Null => None,
            CqlValue::Boolean(_) => Some(LogicalType::Boolean),
            CqlValue::BigInt(_) => Some(LogicalType::BigInt),
            CqlValue::Double(_) => Some(LogicalType::Double),
            CqlValue::Text(_) => Some(LogicalType::Text),
            CqlValue::Blob(_) => Some(LogicalType::Blob),
            CqlValue::Inet(_) => Some(LogicalType::Inet),
        }
    }

    /// Returns true if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, CqlValue::Null)
    }
}

impl fmt::Display for CqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlValue::Null => write!(f, "NULL"),
            CqlValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CqlValue::BigInt(i) => write!(f, "{}", i),
            CqlValue::Double(v) => write!(f, "{}", v),
            CqlValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            CqlValue::Blob(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            CqlValue::Inet(addr) => write!(f, "{}", addr),
        }
    }
}

/// Serializes an address into its raw 4- or 16-byte form.
pub fn encode_inet(addr: &IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Deserializes an address from its raw byte form.
///
/// Only exact 4-byte (IPv4) and 16-byte (IPv6) inputs are representable;
/// any other length is a serialization error.
pub fn decode_inet(bytes: &[u8]) -> CorvusResult<IpAddr> {
    match bytes.len() {
        INET_V4_SIZE => {
            let mut octets = [0u8; INET_V4_SIZE];
            octets.copy_from_slice(bytes);
            Ok(IpAddr::from(octets))
        }
        INET_V6_SIZE => {
            let mut octets = [0u8; INET_V6_SIZE];
            octets.copy_from_slice(bytes);
            Ok(IpAddr::from(octets))
        }
        other => Err(CorvusError::SerializationFailed {
            reason: format!("inet address of {} bytes is not representable", other),
        }),
    }
}
