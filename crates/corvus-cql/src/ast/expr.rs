//! Typed expression tree nodes.
//!
//! Nodes are arity-specialized: each variant owns exactly the number of
//! children its operator requires, and the per-arity operator enums make a
//! mismatched child count unrepresentable at the constructor interface.
//! Every node carries a fixed logical/physical type pair, except column
//! references whose types are bound by a later analysis pass.

use std::fmt;

use corvus_common::error::CorvusResult;
use serde::{Deserialize, Serialize};

use super::name::QualifiedName;
use crate::analyzer::AnalysisContext;
use crate::types::{LogicalType, PhysicalType, TypePair};

/// The closed set of builtin operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// No operation (constants).
    NoOp,

    // Operators that take one operand.
    /// Logical NOT.
    Not,
    /// IS NULL check.
    IsNull,
    /// IS NOT NULL check.
    IsNotNull,
    /// IS TRUE check.
    IsTrue,
    /// IS FALSE check.
    IsFalse,

    // Operators that take two operands.
    /// Equality.
    Eq,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Not equal.
    Ne,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// LIKE pattern match.
    Like,
    /// NOT LIKE pattern match.
    NotLike,
    /// Membership test.
    In,
    /// Negated membership test.
    NotIn,

    // Operators that take three operands.
    /// Range test.
    Between,
    /// Negated range test.
    NotBetween,
}

impl Operator {
    /// Returns the number of child expressions this operator takes.
    pub const fn arity(self) -> usize {
        match self {
            Operator::NoOp => 0,
            Operator::Not
            | Operator::IsNull
            | Operator::IsNotNull
            | Operator::IsTrue
            | Operator::IsFalse => 1,
            Operator::Eq
            | Operator::Lt
            | Operator::Gt
            | Operator::Le
            | Operator::Ge
            | Operator::Ne
            | Operator::And
            | Operator::Or
            | Operator::Like
            | Operator::NotLike
            | Operator::In
            | Operator::NotIn => 2,
            Operator::Between | Operator::NotBetween => 3,
        }
    }

    /// Returns true if this is a comparison operator.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge | Operator::Ne
        )
    }

    /// Returns true if this is a logical connective.
    pub const fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::NoOp => write!(f, "NOOP"),
            Operator::Not => write!(f, "NOT"),
            Operator::IsNull => write!(f, "IS NULL"),
            Operator::IsNotNull => write!(f, "IS NOT NULL"),
            Operator::IsTrue => write!(f, "IS TRUE"),
            Operator::IsFalse => write!(f, "IS FALSE"),
            Operator::Eq => write!(f, "="),
            Operator::Lt => write!(f, "<"),
            Operator::Gt => write!(f, ">"),
            Operator::Le => write!(f, "<="),
            Operator::Ge => write!(f, ">="),
            Operator::Ne => write!(f, "<>"),
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
            Operator::Like => write!(f, "LIKE"),
            Operator::NotLike => write!(f, "NOT LIKE"),
            Operator::In => write!(f, "IN"),
            Operator::NotIn => write!(f, "NOT IN"),
            Operator::Between => write!(f, "BETWEEN"),
            Operator::NotBetween => write!(f, "NOT BETWEEN"),
        }
    }
}

/// Operators taking exactly one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical NOT.
    Not,
    /// IS NULL check.
    IsNull,
    /// IS NOT NULL check.
    IsNotNull,
    /// IS TRUE check.
    IsTrue,
    /// IS FALSE check.
    IsFalse,
}

impl UnaryOperator {
    /// Returns the unified operator tag.
    pub const fn operator(self) -> Operator {
        match self {
            UnaryOperator::Not => Operator::Not,
            UnaryOperator::IsNull => Operator::IsNull,
            UnaryOperator::IsNotNull => Operator::IsNotNull,
            UnaryOperator::IsTrue => Operator::IsTrue,
            UnaryOperator::IsFalse => Operator::IsFalse,
        }
    }
}

/// Operators taking exactly two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// Equality.
    Eq,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Not equal.
    Ne,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// LIKE pattern match.
    Like,
    /// NOT LIKE pattern match.
    NotLike,
    /// Membership test.
    In,
    /// Negated membership test.
    NotIn,
}

impl BinaryOperator {
    /// Returns the unified operator tag.
    pub const fn operator(self) -> Operator {
        match self {
            BinaryOperator::Eq => Operator::Eq,
            BinaryOperator::Lt => Operator::Lt,
            BinaryOperator::Gt => Operator::Gt,
            BinaryOperator::Le => Operator::Le,
            BinaryOperator::Ge => Operator::Ge,
            BinaryOperator::Ne => Operator::Ne,
            BinaryOperator::And => Operator::And,
            BinaryOperator::Or => Operator::Or,
            BinaryOperator::Like => Operator::Like,
            BinaryOperator::NotLike => Operator::NotLike,
            BinaryOperator::In => Operator::In,
            BinaryOperator::NotIn => Operator::NotIn,
        }
    }
}

/// Operators taking exactly three operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TernaryOperator {
    /// Range test.
    Between,
    /// Negated range test.
    NotBetween,
}

impl TernaryOperator {
    /// Returns the unified operator tag.
    pub const fn operator(self) -> Operator {
        match self {
            TernaryOperator::Between => Operator::Between,
            TernaryOperator::NotBetween => Operator::NotBetween,
        }
    }
}

/// A literal constant embedded in a constant expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Boolean value.
    Boolean(bool),
    /// 64-bit integer value.
    BigInt(i64),
    /// 64-bit floating point value.
    Double(f64),
    /// Text value.
    Text(String),
}

impl Literal {
    /// Returns the fixed type pair for this literal kind.
    pub const fn types(&self) -> TypePair {
        match self {
            Literal::Boolean(_) => TypePair::of(LogicalType::Boolean),
            Literal::BigInt(_) => TypePair::of(LogicalType::BigInt),
            Literal::Double(_) => TypePair::of(LogicalType::Double),
            Literal::Text(_) => TypePair::of(LogicalType::Text),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::BigInt(i) => write!(f, "{}", i),
            Literal::Double(v) => write!(f, "{}", v),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// A constant expression node. Zero children; the literal is the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstExpr {
    value: Literal,
}

impl ConstExpr {
    /// Creates a constant node from a literal.
    pub fn new(value: Literal) -> Self {
        Self { value }
    }

    /// Evaluates this node, returning the embedded literal.
    pub fn eval(&self) -> &Literal {
        &self.value
    }

    /// Returns the fixed type pair of this constant.
    pub fn types(&self) -> TypePair {
        self.value.types()
    }
}

/// A predicate node with one operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    /// The operator.
    pub op: UnaryOperator,
    /// The single operand.
    pub operand: Box<Expr>,
}

/// A predicate node with two operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    /// The operator.
    pub op: BinaryOperator,
    /// Left operand.
    pub left: Box<Expr>,
    /// Right operand.
    pub right: Box<Expr>,
}

/// A predicate node with three operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TernaryExpr {
    /// The operator.
    pub op: TernaryOperator,
    /// Tested operand.
    pub first: Box<Expr>,
    /// Lower bound.
    pub second: Box<Expr>,
    /// Upper bound.
    pub third: Box<Expr>,
}

/// A column reference.
///
/// The type pair of this node is unknown at construction and is bound by
/// [`Expr::analyze`] against the visible schema. This is the only node
/// kind whose typing is deferred past construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    name: QualifiedName,
    resolved: Option<TypePair>,
}

impl ColumnRef {
    /// Creates an unresolved column reference.
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            resolved: None,
        }
    }

    /// Returns the referenced name.
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Returns true once analysis has bound this reference.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Returns the bound type pair, if analysis has run.
    pub fn types(&self) -> Option<TypePair> {
        self.resolved
    }

    /// Resolves this reference against the visible schema.
    ///
    /// Idempotent: re-analyzing with the same context re-binds the same
    /// type pair.
    pub fn analyze(&mut self, ctx: &AnalysisContext) -> CorvusResult<()> {
        let column = ctx.resolve(&self.name)?;
        self.resolved = Some(column.types());
        Ok(())
    }
}

/// An expression alias: a wrapped expression plus a result name.
///
/// Exposes the wrapped expression's types by delegation and takes no part
/// in evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasExpr {
    /// The wrapped expression.
    pub expr: Box<Expr>,
    /// The alias name.
    pub alias: String,
}

/// A typed expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Constant value.
    Const(ConstExpr),
    /// One-operand predicate.
    Unary(UnaryExpr),
    /// Two-operand predicate.
    Binary(BinaryExpr),
    /// Three-operand predicate.
    Ternary(TernaryExpr),
    /// Column reference.
    ColumnRef(ColumnRef),
    /// Aliased expression.
    Alias(AliasExpr),
}

impl Expr {
    // ===== Constructors =====

    /// Creates a boolean constant.
    pub fn boolean(value: bool) -> Self {
        Expr::Const(ConstExpr::new(Literal::Boolean(value)))
    }

    /// Creates a 64-bit integer constant.
    pub fn bigint(value: i64) -> Self {
        Expr::Const(ConstExpr::new(Literal::BigInt(value)))
    }

    /// Creates a double constant.
    pub fn double(value: f64) -> Self {
        Expr::Const(ConstExpr::new(Literal::Double(value)))
    }

    /// Creates a text constant.
    pub fn text(value: impl Into<String>) -> Self {
        Expr::Const(ConstExpr::new(Literal::Text(value.into())))
    }

    /// Creates an unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::ColumnRef(ColumnRef::new(QualifiedName::new(name)))
    }

    /// Creates a qualified column reference.
    pub fn qualified_column(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::ColumnRef(ColumnRef::new(QualifiedName::qualified(qualifier, name)))
    }

    /// Creates a one-operand predicate.
    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
        })
    }

    /// Creates a two-operand predicate.
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Creates a three-operand predicate.
    pub fn ternary(op: TernaryOperator, first: Expr, second: Expr, third: Expr) -> Self {
        Expr::Ternary(TernaryExpr {
            op,
            first: Box::new(first),
            second: Box::new(second),
            third: Box::new(third),
        })
    }

    // ===== Builder combinators =====

    /// Equality comparison.
    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Eq, self, other)
    }

    /// Less than comparison.
    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Lt, self, other)
    }

    /// Greater than comparison.
    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Gt, self, other)
    }

    /// Less than or equal comparison.
    pub fn le(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Le, self, other)
    }

    /// Greater than or equal comparison.
    pub fn ge(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Ge, self, other)
    }

    /// Not equal comparison.
    pub fn ne(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Ne, self, other)
    }

    /// Logical AND.
    pub fn and(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::And, self, other)
    }

    /// Logical OR.
    pub fn or(self, other: Expr) -> Self {
        Expr::binary(BinaryOperator::Or, self, other)
    }

    /// LIKE pattern match.
    pub fn like(self, pattern: Expr) -> Self {
        Expr::binary(BinaryOperator::Like, self, pattern)
    }

    /// Membership test.
    pub fn in_list(self, list: Expr) -> Self {
        Expr::binary(BinaryOperator::In, self, list)
    }

    /// Logical NOT.
    pub fn not(self) -> Self {
        Expr::unary(UnaryOperator::Not, self)
    }

    /// IS NULL check.
    pub fn is_null(self) -> Self {
        Expr::unary(UnaryOperator::IsNull, self)
    }

    /// IS NOT NULL check.
    pub fn is_not_null(self) -> Self {
        Expr::unary(UnaryOperator::IsNotNull, self)
    }

    /// Range test.
    pub fn between(self, low: Expr, high: Expr) -> Self {
        Expr::ternary(TernaryOperator::Between, self, low, high)
    }

    /// Negated range test.
    pub fn not_between(self, low: Expr, high: Expr) -> Self {
        Expr::ternary(TernaryOperator::NotBetween, self, low, high)
    }

    /// Wraps this expression under an alias.
    pub fn alias(self, name: impl Into<String>) -> Self {
        Expr::Alias(AliasExpr {
            expr: Box::new(self),
            alias: name.into(),
        })
    }

    // ===== Accessors =====

    /// Returns the operator tag of this node.
    pub fn operator(&self) -> Operator {
        match self {
            Expr::Const(_) => Operator::NoOp,
            Expr::Unary(e) => e.op.operator(),
            Expr::Binary(e) => e.op.operator(),
            Expr::Ternary(e) => e.op.operator(),
            Expr::ColumnRef(_) => Operator::NoOp,
            Expr::Alias(e) => e.expr.operator(),
        }
    }

    /// Returns the number of children this node owns.
    pub fn arity(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::ColumnRef(_) => 0,
            Expr::Unary(_) | Expr::Alias(_) => 1,
            Expr::Binary(_) => 2,
            Expr::Ternary(_) => 3,
        }
    }

    /// Returns the children of this node in operand order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::ColumnRef(_) => Vec::new(),
            Expr::Unary(e) => vec![&e.operand],
            Expr::Binary(e) => vec![&e.left, &e.right],
            Expr::Ternary(e) => vec![&e.first, &e.second, &e.third],
            Expr::Alias(e) => vec![&e.expr],
        }
    }

    /// Returns this node's type pair.
    ///
    /// `None` only for a column reference that has not been analyzed yet
    /// (or an alias wrapping one); every other variant's types are fixed
    /// at construction.
    pub fn types(&self) -> Option<TypePair> {
        match self {
            Expr::Const(e) => Some(e.types()),
            Expr::Unary(_) | Expr::Binary(_) | Expr::Ternary(_) => Some(TypePair::BOOLEAN),
            Expr::ColumnRef(c) => c.types(),
            Expr::Alias(e) => e.expr.types(),
        }
    }

    /// Returns the CQL-visible type of this node.
    pub fn logical_type(&self) -> Option<LogicalType> {
        self.types().map(|t| t.logical)
    }

    /// Returns the storage encoding type of this node.
    pub fn physical_type(&self) -> Option<PhysicalType> {
        self.types().map(|t| t.physical)
    }

    /// Evaluates this node if it is a constant.
    ///
    /// Non-constant nodes are evaluated by the execution engine walking
    /// the tree; this layer only yields embedded literals.
    pub fn eval(&self) -> Option<&Literal> {
        match self {
            Expr::Const(e) => Some(e.eval()),
            _ => None,
        }
    }

    /// Runs semantic analysis over this tree.
    ///
    /// Binds every column reference against the context's visible schema;
    /// all other variants only recurse since their types are fixed.
    /// Idempotent. Fails with a name-resolution error when a name matches
    /// no visible column and an ambiguous-reference error when it matches
    /// more than one.
    pub fn analyze(&mut self, ctx: &AnalysisContext) -> CorvusResult<()> {
        match self {
            Expr::Const(_) => Ok(()),
            Expr::Unary(e) => e.operand.analyze(ctx),
            Expr::Binary(e) => {
                e.left.analyze(ctx)?;
                e.right.analyze(ctx)
            }
            Expr::Ternary(e) => {
                e.first.analyze(ctx)?;
                e.second.analyze(ctx)?;
                e.third.analyze(ctx)
            }
            Expr::ColumnRef(c) => c.analyze(ctx),
            Expr::Alias(e) => e.expr.analyze(ctx),
        }
    }

    /// Returns the output name of this expression.
    pub fn output_name(&self) -> String {
        match self {
            Expr::Const(e) => e.eval().to_string(),
            Expr::Unary(e) => format!("{} {}", e.operand.output_name(), e.op.operator()),
            Expr::Binary(e) => format!(
                "{} {} {}",
                e.left.output_name(),
                e.op.operator(),
                e.right.output_name()
            ),
            Expr::Ternary(e) => format!(
                "{} {} {} AND {}",
                e.first.output_name(),
                e.op.operator(),
                e.second.output_name(),
                e.third.output_name()
            ),
            Expr::ColumnRef(c) => c.name().name.clone(),
            Expr::Alias(e) => e.alias.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisContext;
    use crate::schema::{ColumnSchema, TableName, TableSchema};
    use corvus_common::error::CorvusError;

    fn accounts_table() -> TableSchema {
        TableSchema::new(
            TableName::new("bank", "accounts"),
            vec![
                ColumnSchema::new("id", TypePair::of(LogicalType::BigInt)),
                ColumnSchema::new("balance", TypePair::of(LogicalType::Double)),
                ColumnSchema::new(
                    "frozen",
                    TypePair::new(LogicalType::Boolean, PhysicalType::Int64),
                ),
            ],
        )
    }

    #[test]
    fn test_const_eval_is_stable() {
        let expr = Expr::bigint(42);
        // Type accessors must not disturb the embedded value.
        for _ in 0..3 {
            assert_eq!(expr.logical_type(), Some(LogicalType::BigInt));
            assert_eq!(expr.physical_type(), Some(PhysicalType::Int64));
        }
        assert_eq!(expr.eval(), Some(&Literal::BigInt(42)));

        let text = Expr::text("hello");
        assert_eq!(text.eval(), Some(&Literal::Text("hello".to_string())));
    }

    #[test]
    fn test_arity_matches_children() {
        let exprs = vec![
            Expr::boolean(true),
            Expr::column("id").is_null(),
            Expr::column("id").eq(Expr::bigint(1)),
            Expr::column("id").between(Expr::bigint(1), Expr::bigint(10)),
        ];
        for expr in &exprs {
            assert_eq!(expr.children().len(), expr.arity());
        }
        assert_eq!(exprs[0].operator().arity(), 0);
        assert_eq!(exprs[1].operator().arity(), 1);
        assert_eq!(exprs[2].operator().arity(), 2);
        assert_eq!(exprs[3].operator().arity(), 3);
    }

    #[test]
    fn test_predicates_are_boolean() {
        let expr = Expr::column("balance").gt(Expr::double(0.0));
        assert_eq!(expr.types(), Some(TypePair::BOOLEAN));

        let expr = Expr::column("id").is_not_null();
        assert_eq!(expr.logical_type(), Some(LogicalType::Boolean));
    }

    #[test]
    fn test_eval_undefined_for_non_constants() {
        let expr = Expr::column("id").eq(Expr::bigint(1));
        assert_eq!(expr.eval(), None);
        assert_eq!(Expr::column("id").eval(), None);
    }

    #[test]
    fn test_column_ref_types_deferred() {
        let mut expr = Expr::qualified_column("accounts", "frozen");
        assert_eq!(expr.types(), None);

        let ctx = AnalysisContext::new(accounts_table());
        expr.analyze(&ctx).unwrap();

        // The schema stores this boolean column as int64; the logical and
        // physical axes must reflect that independently.
        assert_eq!(expr.logical_type(), Some(LogicalType::Boolean));
        assert_eq!(expr.physical_type(), Some(PhysicalType::Int64));
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let ctx = AnalysisContext::new(accounts_table());

        let mut expr = Expr::column("balance").gt(Expr::double(100.0));
        expr.analyze(&ctx).unwrap();
        let first = expr.clone();
        expr.analyze(&ctx).unwrap();
        assert_eq!(expr, first);

        // A missing name fails identically on every attempt.
        let mut missing = Expr::column("no_such_column");
        for _ in 0..2 {
            let err = missing.analyze(&ctx).unwrap_err();
            assert!(matches!(err, CorvusError::NameResolution { .. }));
        }
        assert_eq!(missing.types(), None);
    }

    #[test]
    fn test_alias_delegates_types() {
        let ctx = AnalysisContext::new(accounts_table());
        let mut expr = Expr::column("balance").alias("b");
        expr.analyze(&ctx).unwrap();
        assert_eq!(expr.logical_type(), Some(LogicalType::Double));
        assert_eq!(expr.output_name(), "b");
    }

    #[test]
    fn test_output_name() {
        let expr = Expr::column("id").eq(Expr::bigint(1));
        assert_eq!(expr.output_name(), "id = 1");
        assert_eq!(Expr::column("id").output_name(), "id");
    }

    #[test]
    fn test_operator_properties() {
        assert!(Operator::Eq.is_comparison());
        assert!(Operator::And.is_logical());
        assert!(!Operator::Between.is_comparison());
        assert_eq!(Operator::NotBetween.arity(), 3);
        assert_eq!(Operator::NoOp.arity(), 0);
    }

    #[test]
    fn test_tree_is_exclusively_owned() {
        // Children move into their parent; the tree is a proper tree by
        // construction.
        let child = Expr::bigint(5);
        let parent = child.clone().lt(Expr::bigint(10));
        assert_eq!(parent.children().len(), 2);
        assert_eq!(parent.children()[0], &child);
    }
}
