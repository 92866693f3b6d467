//! The statement-executor boundary.
//!
//! The execution engine itself lives outside this layer. The call layer
//! hands it a parsed, registered call; the engine either finishes
//! synchronously or suspends the call and completes it later through the
//! call's resumption handle, exactly once, possibly from another thread.

use std::sync::Arc;

use bytes::Bytes;
use corvus_common::error::CorvusResult;
use corvus_cql::result::{ExecuteResult, PreparedResult};

use crate::protocol::InboundCall;

/// Outcome of handing a call to the execution engine.
#[derive(Debug)]
pub enum ExecOutcome {
    /// Execution finished synchronously with this result.
    Complete(ExecuteResult),
    /// A prepare request finished with this description; the id is the
    /// engine-assigned handle for later `Execute` requests.
    Prepared {
        /// Engine-assigned prepared statement id.
        statement_id: Bytes,
        /// The prepared-statement description.
        result: PreparedResult,
    },
    /// Execution needs an asynchronous dependency. The engine has taken
    /// the call's resumption handle (via [`InboundCall::suspend`]) and
    /// will invoke it exactly once when the dependency completes.
    Suspended,
}

/// Trait for statement execution implementations.
///
/// Implementations read the call's request and session, and may consult
/// an inbound paging token to resume a prior page. Errors returned here
/// are statement-fatal only: the offending call gets an error response
/// and sibling calls on the connection continue.
pub trait StatementExecutor: Send + Sync {
    /// Executes the statement carried by `call`.
    fn execute(&self, call: &Arc<InboundCall>) -> CorvusResult<ExecOutcome>;
}
