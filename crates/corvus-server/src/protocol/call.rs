//! Per-call state machine with suspend/resume.
//!
//! An inbound call is created when a complete frame has been parsed and
//! released once its response has been handed to the outbox. A call that
//! needs an asynchronous backend round trip parks a one-shot
//! [`ResumeHandle`] and returns control immediately; the handle may be
//! invoked later by a different thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use corvus_common::error::{CorvusError, CorvusResult};
use corvus_common::types::StreamId;
use corvus_cql::result::{ExecuteResult, PreparedResult};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::compression::CompressionScheme;
use super::frame::{self, Opcode, FLAG_COMPRESSED};
use super::request::Request;
use super::response::{self, Outbox};
use crate::session::Session;

/// Lifecycle state of an inbound call.
///
/// Frame accumulation happens in the connection's receive buffer, so a
/// call object begins life already `Parsed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Frame decoded, request published.
    Parsed,
    /// Handed to statement execution.
    Executing,
    /// Waiting on an asynchronous dependency; a resumption handle is out.
    Suspended,
    /// Result available, response being serialized.
    Responding,
    /// Response handed to the outbox (or call abandoned).
    Done,
}

/// One-shot resumption state for a suspended call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumeState {
    /// No handle outstanding.
    Idle,
    /// A handle is outstanding and has not fired.
    Armed,
    /// The handle fired; any further resume is misuse.
    Fired,
}

/// A per-request unit of execution.
pub struct InboundCall {
    stream_id: StreamId,
    session: Arc<Session>,
    compression: CompressionScheme,
    request: OnceLock<Request>,
    state: Mutex<CallState>,
    resume: Mutex<ResumeState>,
    abandoned: AtomicBool,
    outbox: Arc<Outbox>,
    registry: Arc<DashMap<StreamId, Arc<InboundCall>>>,
}

impl InboundCall {
    pub(crate) fn new(
        stream_id: StreamId,
        session: Arc<Session>,
        compression: CompressionScheme,
        outbox: Arc<Outbox>,
        registry: Arc<DashMap<StreamId, Arc<InboundCall>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            stream_id,
            session,
            compression,
            request: OnceLock::new(),
            state: Mutex::new(CallState::Parsed),
            resume: Mutex::new(ResumeState::Idle),
            abandoned: AtomicBool::new(false),
            outbox,
            registry,
        })
    }

    /// Returns the stream id routing this call's response.
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Returns the session shared by all calls on this connection.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> CallState {
        *self.state.lock()
    }

    /// Returns the parsed request, once published.
    pub fn request(&self) -> Option<&Request> {
        self.request.get()
    }

    /// Publishes the parsed request exactly once.
    ///
    /// The cell synchronizes the handoff between the thread that parsed
    /// the frame and whichever thread later executes or resumes the call.
    pub(crate) fn publish_request(&self, request: Request) -> CorvusResult<()> {
        self.request
            .set(request)
            .map_err(|_| CorvusError::internal("request already published for this call"))
    }

    pub(crate) fn begin_execution(&self) {
        *self.state.lock() = CallState::Executing;
    }

    /// Parks this call pending an asynchronous dependency.
    ///
    /// Returns the one-shot handle the backend must invoke exactly once.
    /// At most one handle may be pending per call; asking for a second
    /// while one is outstanding is resumption misuse.
    pub fn suspend(self: &Arc<Self>) -> CorvusResult<ResumeHandle> {
        let mut resume = self.resume.lock();
        match *resume {
            ResumeState::Armed => Err(CorvusError::ResumptionMisuse {
                reason: format!(
                    "call {} already has a pending resumption handle",
                    self.stream_id
                ),
            }),
            ResumeState::Fired => Err(CorvusError::ResumptionMisuse {
                reason: format!("call {} was already resumed", self.stream_id),
            }),
            ResumeState::Idle => {
                *resume = ResumeState::Armed;
                *self.state.lock() = CallState::Suspended;
                debug!(stream_id = %self.stream_id, "call suspended");
                Ok(ResumeHandle {
                    call: Arc::clone(self),
                })
            }
        }
    }

    /// Delivers the backend outcome for a suspended call.
    ///
    /// The first invocation completes the call. Any further invocation,
    /// or an invocation without a pending suspension, is detected and
    /// reported as resumption misuse.
    fn resume_with(&self, outcome: CorvusResult<ExecuteResult>) -> CorvusResult<()> {
        {
            let mut resume = self.resume.lock();
            match *resume {
                ResumeState::Armed => *resume = ResumeState::Fired,
                ResumeState::Fired => {
                    warn!(stream_id = %self.stream_id, "call resumed more than once");
                    return Err(CorvusError::ResumptionMisuse {
                        reason: format!("call {} resumed more than once", self.stream_id),
                    });
                }
                ResumeState::Idle => {
                    return Err(CorvusError::ResumptionMisuse {
                        reason: format!("call {} resumed without a pending suspension", self.stream_id),
                    });
                }
            }
        }

        if self.abandoned.load(Ordering::Acquire) {
            // Connection went away while suspended: release resources,
            // produce no response.
            debug!(stream_id = %self.stream_id, "resumed an abandoned call, dropping");
            *self.state.lock() = CallState::Done;
            self.release();
            return Ok(());
        }

        match outcome {
            Ok(result) => self.complete(result),
            Err(err) => {
                self.fail(&err);
                Ok(())
            }
        }
    }

    /// Serializes a successful result and releases the call.
    ///
    /// A keyspace-change result also updates the connection's session
    /// keyspace; the state transition guard ensures that happens exactly
    /// once per call.
    pub(crate) fn complete(&self, result: ExecuteResult) -> CorvusResult<()> {
        self.enter_responding()?;

        if let ExecuteResult::SetKeyspace(ks) = &result {
            self.session.set_keyspace(ks.keyspace());
        }

        let body = match &result {
            ExecuteResult::SetKeyspace(ks) => response::encode_set_keyspace(ks),
            ExecuteResult::Rows(rows) => response::encode_rows(rows),
        };
        self.push_response(Opcode::Result, &body);
        Ok(())
    }

    /// Serializes a prepared-statement result and releases the call.
    pub(crate) fn complete_prepared(
        &self,
        statement_id: &Bytes,
        result: &PreparedResult,
    ) -> CorvusResult<()> {
        self.enter_responding()?;
        let body = response::encode_prepared(statement_id, result);
        self.push_response(Opcode::Result, &body);
        Ok(())
    }

    /// Serializes an error response for this call and releases it.
    ///
    /// Only this call is affected; sibling in-flight calls continue.
    pub(crate) fn fail(&self, err: &CorvusError) {
        if self.enter_responding().is_err() {
            warn!(stream_id = %self.stream_id, error = %err, "error after call completion");
            return;
        }
        debug!(stream_id = %self.stream_id, error = %err, "call failed");
        let body = response::encode_error(err.code().as_u16(), &err.to_string());
        self.push_response(Opcode::Error, &body);
    }

    fn enter_responding(&self) -> CorvusResult<()> {
        let mut state = self.state.lock();
        match *state {
            CallState::Parsed | CallState::Executing | CallState::Suspended => {
                *state = CallState::Responding;
                Ok(())
            }
            CallState::Responding | CallState::Done => Err(CorvusError::ResumptionMisuse {
                reason: format!("call {} already produced its response", self.stream_id),
            }),
        }
    }

    fn push_response(&self, opcode: Opcode, body: &[u8]) {
        let (flags, body) = if self.compression.is_active() {
            match self.compression.compress(body) {
                Ok(compressed) => (FLAG_COMPRESSED, compressed),
                Err(err) => {
                    // Fall back to an uncompressed error frame; the body
                    // of a response must never be silently dropped.
                    warn!(stream_id = %self.stream_id, error = %err, "response compression failed");
                    let fallback = response::encode_error(err.code().as_u16(), &err.to_string());
                    self.outbox.push(
                        self.stream_id,
                        frame::encode(self.stream_id, Opcode::Error, 0, &fallback),
                    );
                    *self.state.lock() = CallState::Done;
                    self.release();
                    return;
                }
            }
        } else {
            (0, body.to_vec())
        };

        self.outbox
            .push(self.stream_id, frame::encode(self.stream_id, opcode, flags, &body));
        *self.state.lock() = CallState::Done;
        self.release();
        debug!(stream_id = %self.stream_id, opcode = ?opcode, "response queued");
    }

    /// Marks this call abandoned because its connection is being torn
    /// down. A pending resumption handle stays invokable for cleanup but
    /// will not produce a response.
    pub(crate) fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
        debug!(stream_id = %self.stream_id, "call abandoned");
    }

    /// Frees this call's stream id for reuse.
    fn release(&self) {
        self.registry.remove(&self.stream_id);
    }
}

impl std::fmt::Debug for InboundCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundCall")
            .field("stream_id", &self.stream_id)
            .field("state", &self.state())
            .finish()
    }
}

/// One-shot continuation for a suspended call.
///
/// The handle is `Send`: the thread that invokes it need not be the
/// thread that suspended the call. Invoking it a second time yields a
/// resumption-misuse error rather than a second response.
pub struct ResumeHandle {
    call: Arc<InboundCall>,
}

impl ResumeHandle {
    /// Returns the stream id of the suspended call.
    pub fn stream_id(&self) -> StreamId {
        self.call.stream_id()
    }

    /// Completes the suspended call with the backend's outcome.
    ///
    /// An `Err` outcome produces an error response for this call only.
    pub fn resume(&self, outcome: CorvusResult<ExecuteResult>) -> CorvusResult<()> {
        self.call.resume_with(outcome)
    }
}

impl std::fmt::Debug for ResumeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeHandle")
            .field("stream_id", &self.stream_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvus_common::types::SessionId;
    use corvus_cql::result::SetKeyspaceResult;

    fn new_call(stream_id: u16) -> (Arc<InboundCall>, Arc<Outbox>, Arc<DashMap<StreamId, Arc<InboundCall>>>) {
        let outbox = Arc::new(Outbox::new());
        let registry = Arc::new(DashMap::new());
        let call = InboundCall::new(
            StreamId::new(stream_id),
            Arc::new(Session::new(SessionId::new(1))),
            CompressionScheme::None,
            Arc::clone(&outbox),
            Arc::clone(&registry),
        );
        registry.insert(call.stream_id(), Arc::clone(&call));
        (call, outbox, registry)
    }

    fn keyspace_result(name: &str) -> ExecuteResult {
        ExecuteResult::SetKeyspace(SetKeyspaceResult::new(name))
    }

    #[test]
    fn test_synchronous_completion() {
        let (call, outbox, registry) = new_call(3);
        call.begin_execution();
        call.complete(keyspace_result("analytics")).unwrap();

        assert_eq!(call.state(), CallState::Done);
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.drain()[0].0, StreamId::new(3));
        // Completion frees the id for reuse.
        assert!(registry.get(&StreamId::new(3)).is_none());
    }

    #[test]
    fn test_keyspace_updated_exactly_once() {
        let (call, _outbox, _registry) = new_call(1);
        call.begin_execution();
        call.complete(keyspace_result("analytics")).unwrap();

        assert_eq!(
            call.session().current_keyspace(),
            Some("analytics".to_string())
        );

        // A late duplicate completion is rejected before it can touch the
        // session again.
        call.session().set_keyspace("other");
        let err = call.complete(keyspace_result("analytics")).unwrap_err();
        assert!(matches!(err, CorvusError::ResumptionMisuse { .. }));
        assert_eq!(call.session().current_keyspace(), Some("other".to_string()));
    }

    #[test]
    fn test_resume_from_another_thread() {
        let (call, outbox, _registry) = new_call(9);
        call.begin_execution();
        let handle = call.suspend().unwrap();
        assert_eq!(call.state(), CallState::Suspended);

        let worker = std::thread::spawn(move || handle.resume(Ok(keyspace_result("ks"))));
        worker.join().unwrap().unwrap();

        assert_eq!(call.state(), CallState::Done);
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_double_resume_is_misuse() {
        let (call, outbox, _registry) = new_call(4);
        call.begin_execution();
        let handle = call.suspend().unwrap();

        handle.resume(Ok(keyspace_result("ks"))).unwrap();
        let err = handle.resume(Ok(keyspace_result("ks"))).unwrap_err();

        assert!(matches!(err, CorvusError::ResumptionMisuse { .. }));
        // No double response.
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_second_pending_handle_is_misuse() {
        let (call, _outbox, _registry) = new_call(5);
        call.begin_execution();
        let _handle = call.suspend().unwrap();
        let err = call.suspend().unwrap_err();
        assert!(matches!(err, CorvusError::ResumptionMisuse { .. }));
    }

    #[test]
    fn test_resume_after_abandon_produces_no_response() {
        let (call, outbox, registry) = new_call(6);
        call.begin_execution();
        let handle = call.suspend().unwrap();

        call.abandon();
        handle.resume(Ok(keyspace_result("ks"))).unwrap();

        assert_eq!(call.state(), CallState::Done);
        assert!(outbox.is_empty());
        assert!(registry.get(&StreamId::new(6)).is_none());

        // Still misuse to fire again.
        let err = handle.resume(Ok(keyspace_result("ks"))).unwrap_err();
        assert!(matches!(err, CorvusError::ResumptionMisuse { .. }));
    }

    #[test]
    fn test_resume_with_error_fails_call_only() {
        let (call, outbox, _registry) = new_call(8);
        call.begin_execution();
        let handle = call.suspend().unwrap();
        handle
            .resume(Err(CorvusError::execution("backend went away")))
            .unwrap();

        let drained = outbox.drain();
        assert_eq!(drained.len(), 1);
        let header = frame::decode_header(&drained[0].1).unwrap();
        assert_eq!(header.opcode, Opcode::Error);
    }

    #[test]
    fn test_request_published_once() {
        let (call, _outbox, _registry) = new_call(2);
        call.publish_request(Request::Prepare {
            statement: "SELECT 1".to_string(),
        })
        .unwrap();
        assert!(call.request().is_some());

        let err = call
            .publish_request(Request::Prepare {
                statement: "SELECT 2".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, CorvusError::Internal { .. }));
    }
}
