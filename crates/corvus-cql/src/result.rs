//! Statement result models.
//!
//! Different results of processing a statement: the immutable description
//! of a prepared DML statement, and the tagged result of executing one.

use std::fmt;

use bytes::Bytes;
use corvus_common::error::{CorvusError, CorvusResult};

use crate::ast::Expr;
use crate::rowblock::RowBlock;
use crate::schema::{ColumnSchema, TableName};

/// Which client protocol produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// A CQL wire-protocol client.
    Cql,
    /// An internal caller.
    Internal,
}

/// Result of preparing a statement.
///
/// Only DML statements produce a prepared result. It describes the schemas
/// of the bind variables used and, for SELECT, the schemas of the selected
/// columns. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedResult {
    table_name: TableName,
    bind_variable_schemas: Vec<ColumnSchema>,
    column_schemas: Vec<ColumnSchema>,
}

impl PreparedResult {
    /// Creates a prepared result from already-resolved schemas.
    ///
    /// Bind variables are in `?` placeholder order; column schemas are in
    /// projection order and empty for non-SELECT statements.
    pub fn new(
        table_name: TableName,
        bind_variable_schemas: Vec<ColumnSchema>,
        column_schemas: Vec<ColumnSchema>,
    ) -> Self {
        Self {
            table_name,
            bind_variable_schemas,
            column_schemas,
        }
    }

    /// Creates a prepared result by reading resolved types off an analyzed
    /// SELECT projection.
    ///
    /// Every projection expression must have been analyzed; an unresolved
    /// column reference here is a lifecycle bug and surfaces as an
    /// internal error.
    pub fn from_projection(
        table_name: TableName,
        bind_variable_schemas: Vec<ColumnSchema>,
        projection: &[Expr],
    ) -> CorvusResult<Self> {
        let mut column_schemas = Vec::with_capacity(projection.len());
        for expr in projection {
            let types = expr.types().ok_or_else(|| {
                CorvusError::internal(format!(
                    "projection '{}' was not analyzed before prepare",
                    expr.output_name()
                ))
            })?;
            column_schemas.push(ColumnSchema::new(expr.output_name(), types));
        }
        Ok(Self {
            table_name,
            bind_variable_schemas,
            column_schemas,
        })
    }

    /// Returns the target table.
    pub fn table_name(&self) -> &TableName {
        &self.table_name
    }

    /// Returns the bind-variable schemas in placeholder order.
    pub fn bind_variable_schemas(&self) -> &[ColumnSchema] {
        &self.bind_variable_schemas
    }

    /// Returns the result-column schemas in projection order.
    pub fn column_schemas(&self) -> &[ColumnSchema] {
        &self.column_schemas
    }
}

/// The paging cursor of a rows result.
///
/// The three states keep "the backend reported the end" distinguishable
/// from "a caller held a live cursor and declined to continue". The
/// protocol layer ferries `Resumable` tokens between client and backend
/// without interpreting their contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingState {
    /// The result set is complete; there is no next page.
    Exhausted,
    /// More rows remain; the token resumes exactly where this page ended.
    Resumable(Bytes),
    /// A caller explicitly dropped a live cursor via
    /// [`RowsResult::clear_paging_state`].
    Abandoned,
}

impl PagingState {
    /// Returns true if a follow-up call can fetch more rows.
    pub fn has_more_pages(&self) -> bool {
        matches!(self, PagingState::Resumable(_))
    }

    /// Returns the resume token, if one is live.
    pub fn resume_token(&self) -> Option<&Bytes> {
        match self {
            PagingState::Resumable(token) => Some(token),
            _ => None,
        }
    }
}

/// Result of "USE <keyspace>". Always terminal; never pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetKeyspaceResult {
    keyspace: String,
}

impl SetKeyspaceResult {
    /// Creates a keyspace-change result.
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
        }
    }

    /// Returns the new keyspace name.
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }
}

/// Result of rows returned from executing a DML statement.
///
/// The row payload stays in its encoded form; [`RowsResult::row_block`]
/// decodes it lazily for the callers that need actual rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsResult {
    table_name: TableName,
    column_schemas: Vec<ColumnSchema>,
    rows_data: Bytes,
    client: ClientKind,
    paging: PagingState,
}

impl RowsResult {
    /// Creates a rows result with a complete (non-paged) row set.
    pub fn new(
        table_name: TableName,
        column_schemas: Vec<ColumnSchema>,
        rows_data: Bytes,
        client: ClientKind,
    ) -> Self {
        Self {
            table_name,
            column_schemas,
            rows_data,
            client,
            paging: PagingState::Exhausted,
        }
    }

    /// Attaches a backend resume token, marking more rows as available.
    pub fn with_resume_token(mut self, token: Bytes) -> Self {
        self.paging = PagingState::Resumable(token);
        self
    }

    /// Returns the source table.
    pub fn table_name(&self) -> &TableName {
        &self.table_name
    }

    /// Returns the result-column schemas in projection order.
    pub fn column_schemas(&self) -> &[ColumnSchema] {
        &self.column_schemas
    }

    /// Returns the encoded row payload.
    pub fn rows_data(&self) -> &Bytes {
        &self.rows_data
    }

    /// Returns the originating client protocol.
    pub fn client(&self) -> ClientKind {
        self.client
    }

    /// Returns the paging cursor.
    pub fn paging_state(&self) -> &PagingState {
        &self.paging
    }

    /// Returns true if a follow-up call can fetch more rows.
    pub fn has_more_pages(&self) -> bool {
        self.paging.has_more_pages()
    }

    /// Returns a handle to the resume token, if one is live.
    ///
    /// `Bytes` is reference-counted, so the token is transferred to the
    /// follow-up call without copying the cursor bytes.
    pub fn resume_token(&self) -> Option<Bytes> {
        self.paging.resume_token().cloned()
    }

    /// Drops a live cursor: the caller has chosen not to continue.
    ///
    /// An already-exhausted result is left as `Exhausted`, so the two
    /// terminal reasons stay distinguishable.
    pub fn clear_paging_state(&mut self) {
        if self.paging.has_more_pages() {
            self.paging = PagingState::Abandoned;
        }
    }

    /// Parses the row payload and returns it as a row block.
    pub fn row_block(&self) -> CorvusResult<RowBlock> {
        RowBlock::decode(self.rows_data.clone())
    }
}

/// Result of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    /// Keyspace change from "USE <keyspace>".
    SetKeyspace(SetKeyspaceResult),
    /// Rows from a DML statement.
    Rows(RowsResult),
}

impl ExecuteResult {
    /// Returns the keyspace-change result if this is one.
    pub fn as_set_keyspace(&self) -> Option<&SetKeyspaceResult> {
        match self {
            ExecuteResult::SetKeyspace(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the rows result if this is one.
    pub fn as_rows(&self) -> Option<&RowsResult> {
        match self {
            ExecuteResult::Rows(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the rows result mutably if this is one.
    pub fn as_rows_mut(&mut self) -> Option<&mut RowsResult> {
        match self {
            ExecuteResult::Rows(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for ExecuteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteResult::SetKeyspace(r) => write!(f, "USE {}", r.keyspace()),
            ExecuteResult::Rows(r) => write!(f, "ROWS from {}", r.table_name()),
        }
    }
}
