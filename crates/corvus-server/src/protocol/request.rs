//! Typed request payloads.
//!
//! A request is the decoded body of one inbound frame. The statement text
//! inside a query is handed to the external parser/analyzer untouched;
//! paging tokens are ferried as opaque bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use corvus_common::error::{CorvusError, CorvusResult};

use super::frame::Opcode;

/// A parsed inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Connection startup; optionally requests body compression.
    Startup {
        /// Compression scheme name, if the client wants one.
        compression: Option<String>,
    },
    /// Execute a statement.
    Query {
        /// CQL statement text.
        statement: String,
        /// Resume token from a prior page, if continuing.
        paging_state: Option<Bytes>,
    },
    /// Prepare a statement.
    Prepare {
        /// CQL statement text.
        statement: String,
    },
    /// Execute a previously prepared statement.
    Execute {
        /// Prepared statement id.
        statement_id: Bytes,
        /// Resume token from a prior page, if continuing.
        paging_state: Option<Bytes>,
    },
}

impl Request {
    /// Returns the opcode this request travels under.
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Startup { .. } => Opcode::Startup,
            Request::Query { .. } => Opcode::Query,
            Request::Prepare { .. } => Opcode::Prepare,
            Request::Execute { .. } => Opcode::Execute,
        }
    }

    /// Decodes a request from an opcode and a (decompressed) frame body.
    pub fn decode(opcode: Opcode, mut body: Bytes) -> CorvusResult<Self> {
        match opcode {
            Opcode::Startup => {
                let compression = if read_u8(&mut body, "startup flag")? != 0 {
                    Some(read_string(&mut body, "compression name")?)
                } else {
                    None
                };
                Ok(Request::Startup { compression })
            }
            Opcode::Query => {
                let statement = read_string(&mut body, "statement")?;
                let paging_state = read_paging(&mut body)?;
                Ok(Request::Query {
                    statement,
                    paging_state,
                })
            }
            Opcode::Prepare => {
                let statement = read_string(&mut body, "statement")?;
                Ok(Request::Prepare { statement })
            }
            Opcode::Execute => {
                let id_len = read_u16(&mut body, "statement id length")? as usize;
                if body.remaining() < id_len {
                    return Err(truncated("statement id"));
                }
                let statement_id = body.split_to(id_len);
                let paging_state = read_paging(&mut body)?;
                Ok(Request::Execute {
                    statement_id,
                    paging_state,
                })
            }
            other => Err(CorvusError::malformed(format!(
                "opcode {:?} is not a request",
                other
            ))),
        }
    }

    /// Encodes this request into a frame body.
    pub fn encode_body(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Request::Startup { compression } => match compression {
                Some(name) => {
                    buf.put_u8(1);
                    put_string(&mut buf, name);
                }
                None => buf.put_u8(0),
            },
            Request::Query {
                statement,
                paging_state,
            } => {
                put_string(&mut buf, statement);
                put_paging(&mut buf, paging_state.as_ref());
            }
            Request::Prepare { statement } => {
                put_string(&mut buf, statement);
            }
            Request::Execute {
                statement_id,
                paging_state,
            } => {
                buf.put_u16(statement_id.len() as u16);
                buf.put_slice(statement_id);
                put_paging(&mut buf, paging_state.as_ref());
            }
        }
        buf.freeze()
    }
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn put_paging(buf: &mut BytesMut, paging: Option<&Bytes>) {
    match paging {
        Some(token) => {
            buf.put_u8(1);
            buf.put_u32(token.len() as u32);
            buf.put_slice(token);
        }
        None => buf.put_u8(0),
    }
}

fn read_paging(body: &mut Bytes) -> CorvusResult<Option<Bytes>> {
    if read_u8(body, "paging flag")? == 0 {
        return Ok(None);
    }
    let len = read_u32(body, "paging token length")? as usize;
    if body.remaining() < len {
        return Err(truncated("paging token"));
    }
    Ok(Some(body.split_to(len)))
}

fn read_string(body: &mut Bytes, what: &str) -> CorvusResult<String> {
    let len = read_u32(body, what)? as usize;
    if body.remaining() < len {
        return Err(truncated(what));
    }
    let bytes = body.split_to(len);
    std::str::from_utf8(&bytes)
        .map(|s| s.to_string())
        .map_err(|_| CorvusError::malformed(format!("{} is not valid UTF-8", what)))
}

fn read_u8(body: &mut Bytes, what: &str) -> CorvusResult<u8> {
    if body.remaining() < 1 {
        return Err(truncated(what));
    }
    Ok(body.get_u8())
}

fn read_u16(body: &mut Bytes, what: &str) -> CorvusResult<u16> {
    if body.remaining() < 2 {
        return Err(truncated(what));
    }
    Ok(body.get_u16())
}

fn read_u32(body: &mut Bytes, what: &str) -> CorvusResult<u32> {
    if body.remaining() < 4 {
        return Err(truncated(what));
    }
    Ok(body.get_u32())
}

fn truncated(what: &str) -> CorvusError {
    CorvusError::malformed(format!("request body truncated reading {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_round_trip() {
        let request = Request::Query {
            statement: "SELECT * FROM events".to_string(),
            paging_state: Some(Bytes::from_static(b"token")),
        };
        let decoded = Request::decode(request.opcode(), request.encode_body()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_startup_round_trip() {
        let with = Request::Startup {
            compression: Some("gzip".to_string()),
        };
        assert_eq!(
            Request::decode(Opcode::Startup, with.encode_body()).unwrap(),
            with
        );

        let without = Request::Startup { compression: None };
        assert_eq!(
            Request::decode(Opcode::Startup, without.encode_body()).unwrap(),
            without
        );
    }

    #[test]
    fn test_execute_round_trip() {
        let request = Request::Execute {
            statement_id: Bytes::from_static(b"stmt-1"),
            paging_state: None,
        };
        let decoded = Request::decode(request.opcode(), request.encode_body()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_truncated_body() {
        let request = Request::Query {
            statement: "SELECT 1".to_string(),
            paging_state: None,
        };
        let body = request.encode_body();
        let cut = body.slice(..body.len() - 3);
        let err = Request::decode(Opcode::Query, cut).unwrap_err();
        assert!(matches!(err, CorvusError::MalformedFrame { .. }));
    }

    #[test]
    fn test_response_opcode_rejected() {
        let err = Request::decode(Opcode::Ready, Bytes::new()).unwrap_err();
        assert!(matches!(err, CorvusError::MalformedFrame { .. }));
    }
}
