//! Name resolution for column references.
//!
//! The external parser invokes [`Expr::analyze`](crate::ast::Expr::analyze)
//! on each statement tree before execution; the context here supplies the
//! qualified-name resolution scope that column-reference analysis runs
//! against.

use corvus_common::error::{CorvusError, CorvusResult};

use crate::ast::QualifiedName;
use crate::schema::{ColumnSchema, TableSchema};

/// The schema scope visible to a statement under analysis.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    tables: Vec<TableSchema>,
}

impl AnalysisContext {
    /// Creates a context with a single visible table.
    pub fn new(table: TableSchema) -> Self {
        Self {
            tables: vec![table],
        }
    }

    /// Creates a context with several visible tables.
    pub fn with_tables(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    /// Returns the visible tables.
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Resolves a qualified name to a single visible column.
    ///
    /// Fails with a name-resolution error when no visible column matches
    /// and an ambiguous-reference error when more than one does. An
    /// unqualified name may match a column in any visible table.
    pub fn resolve(&self, name: &QualifiedName) -> CorvusResult<&ColumnSchema> {
        let mut found: Option<&ColumnSchema> = None;
        for table in &self.tables {
            for column in table.columns() {
                if name.matches(&table.name().table, column.name()) {
                    if found.is_some() {
                        return Err(CorvusError::AmbiguousReference {
                            name: name.qualified_name(),
                        });
                    }
                    found = Some(column);
                }
            }
        }
        found.ok_or_else(|| CorvusError::NameResolution {
            name: name.qualified_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableName;
    use crate::types::{LogicalType, TypePair};

    fn two_table_scope() -> AnalysisContext {
        AnalysisContext::with_tables(vec![
            TableSchema::new(
                TableName::new("shop", "orders"),
                vec![
                    ColumnSchema::new("id", TypePair::of(LogicalType::BigInt)),
                    ColumnSchema::new("total", TypePair::of(LogicalType::Double)),
                ],
            ),
            TableSchema::new(
                TableName::new("shop", "customers"),
                vec![
                    ColumnSchema::new("id", TypePair::of(LogicalType::BigInt)),
                    ColumnSchema::new("email", TypePair::of(LogicalType::Text)),
                ],
            ),
        ])
    }

    #[test]
    fn test_resolve_unqualified() {
        let ctx = two_table_scope();
        let column = ctx.resolve(&QualifiedName::new("email")).unwrap();
        assert_eq!(column.logical_type(), LogicalType::Text);
    }

    #[test]
    fn test_resolve_qualified() {
        let ctx = two_table_scope();
        let column = ctx
            .resolve(&QualifiedName::qualified("orders", "id"))
            .unwrap();
        assert_eq!(column.logical_type(), LogicalType::BigInt);
    }

    #[test]
    fn test_unqualified_duplicate_is_ambiguous() {
        let ctx = two_table_scope();
        let err = ctx.resolve(&QualifiedName::new("id")).unwrap_err();
        assert!(matches!(err, CorvusError::AmbiguousReference { .. }));
    }

    #[test]
    fn test_missing_name_fails() {
        let ctx = two_table_scope();
        let err = ctx.resolve(&QualifiedName::new("phone")).unwrap_err();
        assert!(matches!(err, CorvusError::NameResolution { .. }));
        assert!(err.to_string().contains("phone"));
    }
}
