//! Per-connection context.
//!
//! The whole surface toward the socket layer: feed bytes in, learn how
//! many were consumed, and drain ready-to-send buffers keyed by stream
//! id. Frame extraction is sequential; parsed calls progress concurrently
//! and may complete out of order.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use corvus_common::constants::RECV_BUFFER_CAPACITY;
use corvus_common::error::{CorvusError, CorvusResult};
use corvus_common::types::{ConnectionId, SessionId, StreamId};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::call::InboundCall;
use super::compression::CompressionScheme;
use super::frame::{self, Opcode, HEADER_SIZE};
use super::request::Request;
use super::response::{self, Outbox};
use crate::config::ProtocolConfig;
use crate::executor::{ExecOutcome, StatementExecutor};
use crate::session::Session;

/// Per-connection state: negotiated compression, the logical session,
/// the receive buffer, and the in-flight call map.
pub struct ConnectionContext {
    id: ConnectionId,
    config: ProtocolConfig,
    compression: CompressionScheme,
    session: Arc<Session>,
    recv_buf: BytesMut,
    in_flight: Arc<DashMap<StreamId, Arc<InboundCall>>>,
    outbox: Arc<Outbox>,
    executor: Arc<dyn StatementExecutor>,
    closed: bool,
}

impl ConnectionContext {
    /// Creates the context for a newly accepted connection.
    ///
    /// The logical session is created here, once, and shared by every
    /// call on the connection.
    pub fn new(id: ConnectionId, config: ProtocolConfig, executor: Arc<dyn StatementExecutor>) -> Self {
        Self {
            id,
            config,
            compression: CompressionScheme::None,
            session: Arc::new(Session::new(SessionId::new(id.as_u64()))),
            recv_buf: BytesMut::with_capacity(RECV_BUFFER_CAPACITY),
            in_flight: Arc::new(DashMap::new()),
            outbox: Arc::new(Outbox::new()),
            executor,
            closed: false,
        }
    }

    /// Returns the connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the connection's logical session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the negotiated compression scheme.
    pub fn compression(&self) -> CompressionScheme {
        self.compression
    }

    /// Returns the number of calls currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true once the connection has been torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Appends received bytes and consumes every complete frame present.
    ///
    /// Returns the number of buffered bytes consumed; a trailing partial
    /// frame consumes nothing and waits for more input. A protocol error
    /// closes the connection and is returned to the caller; any
    /// responses already prepared for other calls remain drainable via
    /// [`take_responses`](Self::take_responses).
    pub fn feed(&mut self, data: &[u8]) -> CorvusResult<usize> {
        if self.closed {
            return Err(CorvusError::ConnectionClosed);
        }

        self.recv_buf.extend_from_slice(data);
        let mut consumed = 0;

        loop {
            let total = match frame::frame_size(&self.recv_buf, self.config.max_frame_size) {
                Ok(Some(total)) => total,
                Ok(None) => break,
                Err(err) => {
                    warn!(conn = %self.id, error = %err, "frame extraction failed");
                    self.close();
                    return Err(err);
                }
            };

            let frame_bytes = self.recv_buf.split_to(total).freeze();
            consumed += total;

            if let Err(err) = self.process_frame(frame_bytes) {
                warn!(conn = %self.id, error = %err, "protocol error");
                self.close();
                return Err(err);
            }
        }

        Ok(consumed)
    }

    /// Drains every ready-to-send response buffer, keyed by stream id.
    ///
    /// Usable after close to flush responses prepared before the failure.
    pub fn take_responses(&self) -> Vec<(StreamId, Bytes)> {
        self.outbox.drain()
    }

    /// Tears the connection down.
    ///
    /// Suspended calls are abandoned: their resumption handles stay
    /// invokable for cleanup but produce no response.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for entry in self.in_flight.iter() {
            entry.value().abandon();
        }
        self.in_flight.clear();
        info!(conn = %self.id, "connection closed");
    }

    /// Handles one complete frame. Errors returned here are
    /// connection-fatal; statement-level failures are answered on the
    /// offending call and do not surface.
    fn process_frame(&mut self, frame_bytes: Bytes) -> CorvusResult<()> {
        let header = frame::decode_header(&frame_bytes)?;
        let raw_body = frame_bytes.slice(HEADER_SIZE..);

        // Compression is uniform once negotiated: the compressed flag
        // must agree with the scheme. Startup precedes negotiation and is
        // always plain.
        let body = if header.opcode == Opcode::Startup {
            if header.is_compressed() {
                return Err(CorvusError::CompressionMismatch {
                    reason: "startup frame cannot be compressed".to_string(),
                });
            }
            raw_body
        } else {
            if header.is_compressed() != self.compression.is_active() {
                return Err(CorvusError::CompressionMismatch {
                    reason: format!(
                        "frame compressed={}, negotiated scheme is {}",
                        header.is_compressed(),
                        self.compression
                    ),
                });
            }
            Bytes::from(self.compression.decompress(&raw_body)?)
        };

        let request = Request::decode(header.opcode, body)?;

        if let Request::Startup { compression } = &request {
            self.negotiate(header.stream_id, compression.as_deref())?;
            return Ok(());
        }

        if self.in_flight.contains_key(&header.stream_id) {
            return Err(CorvusError::StreamIdInUse {
                stream_id: header.stream_id,
            });
        }

        let call = InboundCall::new(
            header.stream_id,
            Arc::clone(&self.session),
            self.compression,
            Arc::clone(&self.outbox),
            Arc::clone(&self.in_flight),
        );

        if self.in_flight.len() >= self.config.max_inflight_calls {
            // Overload fails this call only; the connection survives.
            call.fail(&CorvusError::execution(format!(
                "too many in-flight calls (limit {})",
                self.config.max_inflight_calls
            )));
            return Ok(());
        }

        if let Err(err) = call.publish_request(request) {
            call.fail(&err);
            return Ok(());
        }
        self.in_flight.insert(header.stream_id, Arc::clone(&call));
        call.begin_execution();
        self.session.record_statement();
        debug!(conn = %self.id, stream_id = %header.stream_id, "call dispatched");

        match self.executor.execute(&call) {
            Ok(ExecOutcome::Complete(result)) => {
                if let Err(err) = call.complete(result) {
                    warn!(conn = %self.id, stream_id = %header.stream_id, error = %err,
                          "completion raced with another path");
                }
            }
            Ok(ExecOutcome::Prepared {
                statement_id,
                result,
            }) => {
                if let Err(err) = call.complete_prepared(&statement_id, &result) {
                    warn!(conn = %self.id, stream_id = %header.stream_id, error = %err,
                          "completion raced with another path");
                }
            }
            Ok(ExecOutcome::Suspended) => {
                // The engine holds the resumption handle; the call will
                // complete later, possibly on another thread.
            }
            Err(err) => call.fail(&err),
        }

        Ok(())
    }

    fn negotiate(&mut self, stream_id: StreamId, scheme_name: Option<&str>) -> CorvusResult<()> {
        let scheme = match scheme_name {
            Some(name) => CompressionScheme::from_name(name)?,
            None => CompressionScheme::None,
        };
        self.compression = scheme;
        info!(conn = %self.id, scheme = %scheme, "connection started");
        self.outbox.push(
            stream_id,
            frame::encode(stream_id, Opcode::Ready, 0, &response::encode_ready()),
        );
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("id", &self.id)
            .field("compression", &self.compression)
            .field("in_flight", &self.in_flight.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvus_cql::result::{ClientKind, ExecuteResult, RowsResult, SetKeyspaceResult};
    use corvus_cql::schema::TableName;

    /// Completes every call synchronously; "USE <ks>" switches keyspace,
    /// anything else returns an empty rows payload.
    struct ImmediateExecutor;

    impl StatementExecutor for ImmediateExecutor {
        fn execute(&self, call: &Arc<InboundCall>) -> CorvusResult<ExecOutcome> {
            let statement = match call.request() {
                Some(Request::Query { statement, .. }) => statement.clone(),
                _ => String::new(),
            };
            if let Some(keyspace) = statement.strip_prefix("USE ") {
                return Ok(ExecOutcome::Complete(ExecuteResult::SetKeyspace(
                    SetKeyspaceResult::new(keyspace),
                )));
            }
            Ok(ExecOutcome::Complete(ExecuteResult::Rows(RowsResult::new(
                TableName::new("ks", "t"),
                Vec::new(),
                Bytes::new(),
                ClientKind::Cql,
            ))))
        }
    }

    fn query_frame(stream_id: u16, statement: &str) -> Bytes {
        let request = Request::Query {
            statement: statement.to_string(),
            paging_state: None,
        };
        frame::encode(
            StreamId::new(stream_id),
            request.opcode(),
            0,
            &request.encode_body(),
        )
    }

    fn new_conn() -> ConnectionContext {
        ConnectionContext::new(
            ConnectionId::new(1),
            ProtocolConfig::default(),
            Arc::new(ImmediateExecutor),
        )
    }

    #[test]
    fn test_partial_frame_consumes_nothing() {
        let mut conn = new_conn();
        let frame = query_frame(1, "SELECT 1");

        assert_eq!(conn.feed(&frame[..5]).unwrap(), 0);
        // Delivering the rest completes the frame.
        assert_eq!(conn.feed(&frame[5..]).unwrap(), frame.len());
        assert_eq!(conn.take_responses().len(), 1);
    }

    #[test]
    fn test_trailing_bytes_stay_buffered() {
        let mut conn = new_conn();
        let frame = query_frame(1, "SELECT 1");
        let mut data = frame.to_vec();
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        // Exactly the frame is consumed; the 3 stray bytes wait for more
        // input.
        assert_eq!(conn.feed(&data).unwrap(), frame.len());
        assert_eq!(conn.recv_buf.len(), 3);
    }

    #[test]
    fn test_keyspace_change_updates_session() {
        let mut conn = new_conn();
        conn.feed(&query_frame(2, "USE analytics")).unwrap();

        assert_eq!(
            conn.session().current_keyspace(),
            Some("analytics".to_string())
        );
        let responses = conn.take_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].0, StreamId::new(2));
    }

    #[test]
    fn test_oversized_frame_closes_connection() {
        let mut conn = ConnectionContext::new(
            ConnectionId::new(1),
            ProtocolConfig::builder().max_frame_size(32).build(),
            Arc::new(ImmediateExecutor),
        );
        let frame = query_frame(1, &"x".repeat(64));

        let err = conn.feed(&frame).unwrap_err();
        assert!(matches!(err, CorvusError::FrameTooLarge { .. }));
        assert!(conn.is_closed());
        assert!(matches!(
            conn.feed(b"more").unwrap_err(),
            CorvusError::ConnectionClosed
        ));
    }

    #[test]
    fn test_startup_negotiates_gzip() {
        let mut conn = new_conn();
        let startup = Request::Startup {
            compression: Some("gzip".to_string()),
        };
        let startup_frame = frame::encode(StreamId::new(0), Opcode::Startup, 0, &startup.encode_body());
        conn.feed(&startup_frame).unwrap();
        assert_eq!(conn.compression(), CompressionScheme::Gzip);

        let ready = conn.take_responses();
        assert_eq!(ready.len(), 1);
        let header = frame::decode_header(&ready[0].1).unwrap();
        assert_eq!(header.opcode, Opcode::Ready);

        // Subsequent frames must be compressed and marked as such.
        let request = Request::Query {
            statement: "USE sales".to_string(),
            paging_state: None,
        };
        let body = CompressionScheme::Gzip
            .compress(&request.encode_body())
            .unwrap();
        let compressed_frame = frame::encode(
            StreamId::new(1),
            Opcode::Query,
            frame::FLAG_COMPRESSED,
            &body,
        );
        conn.feed(&compressed_frame).unwrap();
        assert_eq!(conn.session().current_keyspace(), Some("sales".to_string()));

        // And responses come back compressed too.
        let responses = conn.take_responses();
        let header = frame::decode_header(&responses[0].1).unwrap();
        assert!(header.is_compressed());
    }

    #[test]
    fn test_uncompressed_frame_after_negotiation_is_fatal() {
        let mut conn = new_conn();
        let startup = Request::Startup {
            compression: Some("gzip".to_string()),
        };
        conn.feed(&frame::encode(
            StreamId::new(0),
            Opcode::Startup,
            0,
            &startup.encode_body(),
        ))
        .unwrap();

        let err = conn.feed(&query_frame(1, "SELECT 1")).unwrap_err();
        assert!(matches!(err, CorvusError::CompressionMismatch { .. }));
        assert!(conn.is_closed());
    }

    #[test]
    fn test_unknown_compression_is_fatal() {
        let mut conn = new_conn();
        let startup = Request::Startup {
            compression: Some("zstd".to_string()),
        };
        let err = conn
            .feed(&frame::encode(
                StreamId::new(0),
                Opcode::Startup,
                0,
                &startup.encode_body(),
            ))
            .unwrap_err();
        assert!(matches!(err, CorvusError::UnsupportedCompression { .. }));
    }

    #[test]
    fn test_pipelined_calls_in_one_feed() {
        let mut conn = new_conn();
        let mut data = query_frame(5, "SELECT a").to_vec();
        data.extend_from_slice(&query_frame(7, "SELECT b"));

        let consumed = conn.feed(&data).unwrap();
        assert_eq!(consumed, data.len());

        let responses = conn.take_responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].0, StreamId::new(5));
        assert_eq!(responses[1].0, StreamId::new(7));
        // Both completed, so both ids are free again.
        assert_eq!(conn.in_flight_count(), 0);
    }
}
