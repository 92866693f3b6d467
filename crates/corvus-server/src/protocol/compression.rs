//! Negotiated frame-body compression.
//!
//! A connection negotiates its scheme once at startup; every subsequent
//! frame body on that connection is compressed and decompressed uniformly
//! under that scheme, in both directions.

use std::fmt;
use std::io::{Read, Write};

use corvus_common::error::{CorvusError, CorvusResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// The compression scheme negotiated for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionScheme {
    /// No compression (the default).
    #[default]
    None,
    /// Gzip-compressed frame bodies.
    Gzip,
}

impl CompressionScheme {
    /// Parses a scheme from the name a client sends at startup.
    ///
    /// Unknown names are a protocol error.
    pub fn from_name(name: &str) -> CorvusResult<Self> {
        match name {
            "gzip" => Ok(CompressionScheme::Gzip),
            other => Err(CorvusError::UnsupportedCompression {
                scheme: other.to_string(),
            }),
        }
    }

    /// Returns the negotiated scheme name.
    pub const fn name(&self) -> &'static str {
        match self {
            CompressionScheme::None => "none",
            CompressionScheme::Gzip => "gzip",
        }
    }

    /// Returns true if frame bodies are transformed under this scheme.
    pub const fn is_active(&self) -> bool {
        !matches!(self, CompressionScheme::None)
    }

    /// Compresses a frame body.
    pub fn compress(&self, body: &[u8]) -> CorvusResult<Vec<u8>> {
        match self {
            CompressionScheme::None => Ok(body.to_vec()),
            CompressionScheme::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
                encoder
                    .write_all(body)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| CorvusError::internal(format!("gzip encode failed: {}", e)))
            }
        }
    }

    /// Decompresses a frame body.
    ///
    /// A body that does not decode under the negotiated scheme is a
    /// protocol error.
    pub fn decompress(&self, body: &[u8]) -> CorvusResult<Vec<u8>> {
        match self {
            CompressionScheme::None => Ok(body.to_vec()),
            CompressionScheme::Gzip => {
                if !is_gzip(body) {
                    return Err(CorvusError::CompressionMismatch {
                        reason: "body does not carry the gzip magic".to_string(),
                    });
                }
                let mut decoder = GzDecoder::new(body);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).map_err(|e| {
                    CorvusError::CompressionMismatch {
                        reason: format!("gzip decode failed: {}", e),
                    }
                })?;
                Ok(out)
            }
        }
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Checks the gzip magic bytes.
#[inline]
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}
