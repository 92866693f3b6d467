//! Response serialization and the per-connection outbox.
//!
//! Once a frame is pushed into the outbox it is immutable; the transport
//! may read it concurrently with further call completions.

use std::collections::VecDeque;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use corvus_common::error::{CorvusError, CorvusResult};
use corvus_common::types::StreamId;
use corvus_cql::result::{PreparedResult, RowsResult, SetKeyspaceResult};
use corvus_cql::schema::{ColumnSchema, TableName};
use corvus_cql::types::{LogicalType, PhysicalType, TypePair};
use parking_lot::Mutex;

use super::frame::Opcode;

const RESULT_KIND_SET_KEYSPACE: u32 = 1;
const RESULT_KIND_ROWS: u32 = 2;
const RESULT_KIND_PREPARED: u32 = 3;

/// Ready-to-send response frames keyed by stream id.
///
/// Calls on one connection complete out of order; the outbox preserves
/// completion order but every buffer stays bound to the stream id of the
/// call that produced it.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Mutex<VecDeque<(StreamId, Bytes)>>,
}

impl Outbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a finished response frame for a stream id.
    pub fn push(&self, stream_id: StreamId, frame: Bytes) {
        self.queue.lock().push_back((stream_id, frame));
    }

    /// Drains every ready-to-send buffer.
    pub fn drain(&self) -> Vec<(StreamId, Bytes)> {
        self.queue.lock().drain(..).collect()
    }

    /// Returns the number of queued buffers.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// A decoded response body, used by clients and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Startup acknowledged.
    Ready,
    /// Keyspace changed.
    SetKeyspace(String),
    /// Rows, with an optional resume token for the next page.
    Rows {
        /// Resume token, present while more pages remain.
        paging_state: Option<Bytes>,
        /// Encoded row-block payload.
        rows_data: Bytes,
    },
    /// A statement was prepared.
    Prepared {
        /// Server-assigned prepared statement id.
        statement_id: Bytes,
        /// Target table.
        table_name: TableName,
        /// Bind-variable schemas in placeholder order.
        bind_variable_schemas: Vec<ColumnSchema>,
        /// Result-column schemas in projection order.
        column_schemas: Vec<ColumnSchema>,
    },
    /// Statement or protocol failure.
    Error {
        /// Stable error code.
        code: u16,
        /// Human-readable message.
        message: String,
    },
}

impl Response {
    /// Decodes a response from an opcode and a (decompressed) frame body.
    pub fn decode(opcode: Opcode, mut body: Bytes) -> CorvusResult<Self> {
        match opcode {
            Opcode::Ready => Ok(Response::Ready),
            Opcode::Result => {
                if body.remaining() < 4 {
                    return Err(CorvusError::malformed("result body truncated"));
                }
                match body.get_u32() {
                    RESULT_KIND_SET_KEYSPACE => {
                        if body.remaining() < 4 {
                            return Err(CorvusError::malformed("keyspace name truncated"));
                        }
                        let len = body.get_u32() as usize;
                        if body.remaining() < len {
                            return Err(CorvusError::malformed("keyspace name truncated"));
                        }
                        let name = body.split_to(len);
                        let keyspace = std::str::from_utf8(&name)
                            .map_err(|_| CorvusError::malformed("keyspace is not valid UTF-8"))?;
                        Ok(Response::SetKeyspace(keyspace.to_string()))
                    }
                    RESULT_KIND_ROWS => {
                        if body.remaining() < 1 {
                            return Err(CorvusError::malformed("rows body truncated"));
                        }
                        let paging_state = if body.get_u8() != 0 {
                            if body.remaining() < 4 {
                                return Err(CorvusError::malformed("paging token truncated"));
                            }
                            let len = body.get_u32() as usize;
                            if body.remaining() < len {
                                return Err(CorvusError::malformed("paging token truncated"));
                            }
                            Some(body.split_to(len))
                        } else {
                            None
                        };
                        Ok(Response::Rows {
                            paging_state,
                            rows_data: body,
                        })
                    }
                    RESULT_KIND_PREPARED => {
                        let id_len = read_u16(&mut body, "statement id length")? as usize;
                        if body.remaining() < id_len {
                            return Err(CorvusError::malformed("statement id truncated"));
                        }
                        let statement_id = body.split_to(id_len);
                        let keyspace = read_short_string(&mut body, "keyspace")?;
                        let table = read_short_string(&mut body, "table")?;
                        let bind_variable_schemas = read_columns(&mut body, "bind variables")?;
                        let column_schemas = read_columns(&mut body, "result columns")?;
                        Ok(Response::Prepared {
                            statement_id,
                            table_name: TableName::new(keyspace, table),
                            bind_variable_schemas,
                            column_schemas,
                        })
                    }
                    kind => Err(CorvusError::malformed(format!(
                        "unknown result kind {}",
                        kind
                    ))),
                }
            }
            Opcode::Error => {
                if body.remaining() < 6 {
                    return Err(CorvusError::malformed("error body truncated"));
                }
                let code = body.get_u16();
                let len = body.get_u32() as usize;
                if body.remaining() < len {
                    return Err(CorvusError::malformed("error message truncated"));
                }
                let raw = body.split_to(len);
                let message = std::str::from_utf8(&raw)
                    .map_err(|_| CorvusError::malformed("error message is not valid UTF-8"))?
                    .to_string();
                Ok(Response::Error { code, message })
            }
            other => Err(CorvusError::malformed(format!(
                "opcode {:?} is not a response",
                other
            ))),
        }
    }
}

/// Encodes the body of a Ready response.
pub fn encode_ready() -> Bytes {
    Bytes::new()
}

/// Encodes the body of a keyspace-change result.
pub fn encode_set_keyspace(result: &SetKeyspaceResult) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u32(RESULT_KIND_SET_KEYSPACE);
    buf.put_u32(result.keyspace().len() as u32);
    buf.put_slice(result.keyspace().as_bytes());
    buf.freeze()
}

/// Encodes the body of a rows result.
///
/// The row payload is forwarded unchanged; only the paging token and the
/// result kind are framed around it. The cursor bytes are never
/// interpreted here.
pub fn encode_rows(result: &RowsResult) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u32(RESULT_KIND_ROWS);
    match result.resume_token() {
        Some(token) => {
            buf.put_u8(1);
            buf.put_u32(token.len() as u32);
            buf.put_slice(&token);
        }
        None => buf.put_u8(0),
    }
    buf.put_slice(result.rows_data());
    buf.freeze()
}

/// Encodes the body of a prepared-statement result.
pub fn encode_prepared(statement_id: &Bytes, result: &PreparedResult) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u32(RESULT_KIND_PREPARED);
    buf.put_u16(statement_id.len() as u16);
    buf.put_slice(statement_id);
    put_short_string(&mut buf, &result.table_name().keyspace);
    put_short_string(&mut buf, &result.table_name().table);
    put_columns(&mut buf, result.bind_variable_schemas());
    put_columns(&mut buf, result.column_schemas());
    buf.freeze()
}

/// Encodes the body of an error response.
pub fn encode_error(code: u16, message: &str) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u16(code);
    buf.put_u32(message.len() as u32);
    buf.put_slice(message.as_bytes());
    buf.freeze()
}

fn put_short_string(buf: &mut BytesMut, s: &str) {
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

fn put_columns(buf: &mut BytesMut, columns: &[ColumnSchema]) {
    buf.put_u16(columns.len() as u16);
    for column in columns {
        put_short_string(buf, column.name());
        buf.put_u8(column.logical_type().as_u8());
        buf.put_u8(column.physical_type().as_u8());
    }
}

fn read_u16(body: &mut Bytes, what: &str) -> CorvusResult<u16> {
    if body.remaining() < 2 {
        return Err(CorvusError::malformed(format!("{} truncated", what)));
    }
    Ok(body.get_u16())
}

fn read_short_string(body: &mut Bytes, what: &str) -> CorvusResult<String> {
    let len = read_u16(body, what)? as usize;
    if body.remaining() < len {
        return Err(CorvusError::malformed(format!("{} truncated", what)));
    }
    let raw = body.split_to(len);
    std::str::from_utf8(&raw)
        .map(|s| s.to_string())
        .map_err(|_| CorvusError::malformed(format!("{} is not valid UTF-8", what)))
}

fn read_columns(body: &mut Bytes, what: &str) -> CorvusResult<Vec<ColumnSchema>> {
    let count = read_u16(body, what)? as usize;
    let mut columns = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_short_string(body, what)?;
        let logical = LogicalType::from_u8(read_u8(body, what)?)
            .ok_or_else(|| CorvusError::malformed("unknown logical type tag"))?;
        let physical = PhysicalType::from_u8(read_u8(body, what)?)
            .ok_or_else(|| CorvusError::malformed("unknown physical type tag"))?;
        columns.push(ColumnSchema::new(name, TypePair::new(logical, physical)));
    }
    Ok(columns)
}

fn read_u8(body: &mut Bytes, what: &str) -> CorvusResult<u8> {
    if body.remaining() < 1 {
        return Err(CorvusError::malformed(format!("{} truncated", what)));
    }
    Ok(body.get_u8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvus_cql::result::ClientKind;
    use corvus_cql::schema::TableName;

    #[test]
    fn test_outbox_keys_by_stream_id() {
        let outbox = Outbox::new();
        outbox.push(StreamId::new(7), Bytes::from_static(b"seven"));
        outbox.push(StreamId::new(5), Bytes::from_static(b"five"));

        let drained = outbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, StreamId::new(7));
        assert_eq!(drained[1].0, StreamId::new(5));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_set_keyspace_round_trip() {
        let body = encode_set_keyspace(&SetKeyspaceResult::new("analytics"));
        let decoded = Response::decode(Opcode::Result, body).unwrap();
        assert_eq!(decoded, Response::SetKeyspace("analytics".to_string()));
    }

    #[test]
    fn test_rows_round_trip() {
        let rows = RowsResult::new(
            TableName::new("ks", "t"),
            Vec::new(),
            Bytes::from_static(b"rowdata"),
            ClientKind::Cql,
        )
        .with_resume_token(Bytes::from_static(b"cursor"));

        let decoded = Response::decode(Opcode::Result, encode_rows(&rows)).unwrap();
        match decoded {
            Response::Rows {
                paging_state,
                rows_data,
            } => {
                assert_eq!(paging_state.unwrap(), Bytes::from_static(b"cursor"));
                assert_eq!(rows_data, Bytes::from_static(b"rowdata"));
            }
            other => panic!("expected Rows, got {:?}", other),
        }
    }

    #[test]
    fn test_prepared_round_trip() {
        let prepared = PreparedResult::new(
            TableName::new("bank", "accounts"),
            vec![ColumnSchema::new("id", TypePair::of(LogicalType::BigInt))],
            vec![
                ColumnSchema::new("id", TypePair::of(LogicalType::BigInt)),
                ColumnSchema::new("balance", TypePair::of(LogicalType::Double)),
            ],
        );
        let id = Bytes::from_static(b"stmt-17");

        let decoded = Response::decode(Opcode::Result, encode_prepared(&id, &prepared)).unwrap();
        match decoded {
            Response::Prepared {
                statement_id,
                table_name,
                bind_variable_schemas,
                column_schemas,
            } => {
                assert_eq!(statement_id, id);
                assert_eq!(table_name, TableName::new("bank", "accounts"));
                assert_eq!(bind_variable_schemas, prepared.bind_variable_schemas());
                assert_eq!(column_schemas, prepared.column_schemas());
            }
            other => panic!("expected Prepared, got {:?}", other),
        }
    }

    #[test]
    fn test_error_round_trip() {
        let body = encode_error(0x0300, "backend unavailable");
        let decoded = Response::decode(Opcode::Error, body).unwrap();
        assert_eq!(
            decoded,
            Response::Error {
                code: 0x0300,
                message: "backend unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_ready_is_empty() {
        assert_eq!(encode_ready().len(), 0);
        assert_eq!(
            Response::decode(Opcode::Ready, Bytes::new()).unwrap(),
            Response::Ready
        );
    }
}
