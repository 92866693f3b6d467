//! Frame extraction and encoding.
//!
//! Wire layout (big-endian):
//!
//! ```text
//! +------------+----------+-------------+-----------+----------+--------+
//! | version(1) | flags(1) | stream id(2)| opcode(1) | length(4)| body   |
//! +------------+----------+-------------+-----------+----------+--------+
//! ```
//!
//! `length` counts body bytes only. Bit 0 of `flags` marks a compressed
//! body.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use corvus_common::error::{CorvusError, CorvusResult};
use corvus_common::types::StreamId;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 1 + 1 + 2 + 1 + 4;

/// The protocol version this layer speaks.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Flag bit marking a compressed frame body.
pub const FLAG_COMPRESSED: u8 = 0x01;

/// Frame opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Error response.
    Error = 0x00,
    /// Connection startup request (negotiates compression).
    Startup = 0x01,
    /// Startup acknowledgement.
    Ready = 0x02,
    /// Statement execution request.
    Query = 0x07,
    /// Execution result response.
    Result = 0x08,
    /// Statement preparation request.
    Prepare = 0x09,
    /// Prepared-statement execution request.
    Execute = 0x0A,
}

impl Opcode {
    /// Returns the wire byte for this opcode.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a wire byte back into an opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::Error),
            0x01 => Some(Opcode::Startup),
            0x02 => Some(Opcode::Ready),
            0x07 => Some(Opcode::Query),
            0x08 => Some(Opcode::Result),
            0x09 => Some(Opcode::Prepare),
            0x0A => Some(Opcode::Execute),
            _ => None,
        }
    }

    /// Returns true for request opcodes (client to server).
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            Opcode::Startup | Opcode::Query | Opcode::Prepare | Opcode::Execute
        )
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version byte.
    pub version: u8,
    /// Frame flags.
    pub flags: u8,
    /// Stream id routing this frame.
    pub stream_id: StreamId,
    /// Frame opcode.
    pub opcode: Opcode,
    /// Body length in bytes.
    pub body_len: u32,
}

impl FrameHeader {
    /// Returns true if the body is marked compressed.
    pub const fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Checks if a buffer starts with a complete frame.
///
/// Returns `Ok(Some(total))` with the full frame length when one is
/// available, `Ok(None)` when more bytes are needed, and an error when the
/// declared length exceeds `max_frame_size` (the connection must close).
pub fn frame_size(data: &[u8], max_frame_size: usize) -> CorvusResult<Option<usize>> {
    if data.len() < HEADER_SIZE {
        return Ok(None);
    }

    let body_len = u32::from_be_bytes([data[5], data[6], data[7], data[8]]) as usize;
    let total = HEADER_SIZE + body_len;

    if total > max_frame_size {
        return Err(CorvusError::FrameTooLarge {
            size: total,
            max_size: max_frame_size,
        });
    }

    if data.len() >= total {
        Ok(Some(total))
    } else {
        Ok(None)
    }
}

/// Decodes a frame header.
///
/// Rejects unknown versions and opcodes as protocol errors.
pub fn decode_header(data: &[u8]) -> CorvusResult<FrameHeader> {
    if data.len() < HEADER_SIZE {
        return Err(CorvusError::malformed("frame shorter than header"));
    }

    let mut buf = data;
    let version = buf.get_u8();
    if version != PROTOCOL_VERSION {
        return Err(CorvusError::UnsupportedVersion { version });
    }

    let flags = buf.get_u8();
    let stream_id = StreamId::new(buf.get_u16());
    let opcode_byte = buf.get_u8();
    let opcode = Opcode::from_u8(opcode_byte)
        .ok_or_else(|| CorvusError::malformed(format!("unknown opcode {:#04x}", opcode_byte)))?;
    let body_len = buf.get_u32();

    Ok(FrameHeader {
        version,
        flags,
        stream_id,
        opcode,
        body_len,
    })
}

/// Encodes a frame from its parts.
pub fn encode(stream_id: StreamId, opcode: Opcode, flags: u8, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(flags);
    buf.put_u16(stream_id.as_u16());
    buf.put_u8(opcode.as_u8());
    buf.put_u32(body.len() as u32);
    buf.put_slice(body);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvus_common::constants::MAX_FRAME_SIZE;

    #[test]
    fn test_encode_decode_round_trip() {
        let frame = encode(StreamId::new(5), Opcode::Query, 0, b"payload");
        let header = decode_header(&frame).unwrap();

        assert_eq!(header.version, PROTOCOL_VERSION);
        assert_eq!(header.stream_id, StreamId::new(5));
        assert_eq!(header.opcode, Opcode::Query);
        assert_eq!(header.body_len, 7);
        assert!(!header.is_compressed());
        assert_eq!(&frame[HEADER_SIZE..], b"payload");
    }

    #[test]
    fn test_frame_size_partial() {
        let frame = encode(StreamId::new(1), Opcode::Query, 0, b"body");

        // Incomplete header
        assert_eq!(frame_size(&frame[..4], MAX_FRAME_SIZE).unwrap(), None);
        // Incomplete body
        assert_eq!(
            frame_size(&frame[..frame.len() - 1], MAX_FRAME_SIZE).unwrap(),
            None
        );
        // Complete
        assert_eq!(
            frame_size(&frame, MAX_FRAME_SIZE).unwrap(),
            Some(frame.len())
        );
    }

    #[test]
    fn test_frame_size_with_trailing_bytes() {
        let frame = encode(StreamId::new(1), Opcode::Query, 0, b"body");
        let mut data = frame.to_vec();
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        // Exactly the frame length is reported; the 3 extra bytes stay.
        assert_eq!(
            frame_size(&data, MAX_FRAME_SIZE).unwrap(),
            Some(frame.len())
        );
        assert_eq!(data.len() - frame.len(), 3);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let frame = encode(StreamId::new(1), Opcode::Query, 0, &[0u8; 64]);
        let err = frame_size(&frame, 32).unwrap_err();
        assert!(matches!(err, CorvusError::FrameTooLarge { .. }));
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn test_unknown_version() {
        let mut frame = encode(StreamId::new(1), Opcode::Query, 0, b"").to_vec();
        frame[0] = 0x7F;
        let err = decode_header(&frame).unwrap_err();
        assert!(matches!(err, CorvusError::UnsupportedVersion { version: 0x7F }));
    }

    #[test]
    fn test_unknown_opcode() {
        let mut frame = encode(StreamId::new(1), Opcode::Query, 0, b"").to_vec();
        frame[4] = 0x55;
        let err = decode_header(&frame).unwrap_err();
        assert!(matches!(err, CorvusError::MalformedFrame { .. }));
    }

    #[test]
    fn test_opcode_round_trip() {
        for op in [
            Opcode::Error,
            Opcode::Startup,
            Opcode::Ready,
            Opcode::Query,
            Opcode::Result,
            Opcode::Prepare,
            Opcode::Execute,
        ] {
            assert_eq!(Opcode::from_u8(op.as_u8()), Some(op));
        }
        assert_eq!(Opcode::from_u8(0x77), None);
    }
}
