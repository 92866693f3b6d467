//! # corvus-cql
//!
//! CQL front end for CorvusDB: typed expression AST, semantic analysis,
//! and statement results.
//!
//! This crate implements:
//! - The dual type tag system (logical CQL type + physical storage type)
//! - Typed expression tree nodes with arity-specialized constructors
//! - Name resolution for column references against a visible schema
//! - Prepared-statement and execution result models, including paging
//! - The row-block codec and CQL value representation

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Expression tree nodes and qualified names
pub mod ast;

/// Name resolution for column references
pub mod analyzer;

/// Statement result models
pub mod result;

/// Row-block encoding and decoding
pub mod rowblock;

/// Table and column schemas
pub mod schema;

/// Logical and physical type tags
pub mod types;

/// Runtime CQL values
pub mod value;

pub use analyzer::AnalysisContext;
pub use ast::{
    AliasExpr, BinaryExpr, BinaryOperator, ColumnRef, ConstExpr, Expr, Literal, Operator,
    QualifiedName, TernaryExpr, TernaryOperator, UnaryExpr, UnaryOperator,
};
pub use result::{
    ClientKind, ExecuteResult, PagingState, PreparedResult, RowsResult, SetKeyspaceResult,
};
pub use rowblock::RowBlock;
pub use schema::{ColumnSchema, TableName, TableSchema};
pub use types::{LogicalType, PhysicalType, TypePair};
pub use value::CqlValue;
