//! Expression tree nodes.
//!
//! The external parser builds these nodes; after semantic analysis the
//! tree is immutable and may be read concurrently without
//! synchronization.

mod expr;
mod name;

pub use expr::{
    AliasExpr, BinaryExpr, BinaryOperator, ColumnRef, ConstExpr, Expr, Literal, Operator,
    TernaryExpr, TernaryOperator, UnaryExpr, UnaryOperator,
};
pub use name::QualifiedName;
