//! Table and column schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{LogicalType, PhysicalType, TypePair};

/// A keyspace-qualified table identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    /// The keyspace containing the table.
    pub keyspace: String,
    /// The table name.
    pub table: String,
}

impl TableName {
    /// Creates a new table name.
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

/// A column schema: name plus the dual type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    name: String,
    types: TypePair,
}

impl ColumnSchema {
    /// Creates a new column schema.
    pub fn new(name: impl Into<String>, types: TypePair) -> Self {
        Self {
            name: name.into(),
            types,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dual type descriptor.
    pub fn types(&self) -> TypePair {
        self.types
    }

    /// Returns the CQL-visible type.
    pub fn logical_type(&self) -> LogicalType {
        self.types.logical
    }

    /// Returns the storage encoding type.
    pub fn physical_type(&self) -> PhysicalType {
        self.types.physical
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.types)
    }
}

/// The schema of one table visible to semantic analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    name: TableName,
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a new table schema.
    pub fn new(name: TableName, columns: Vec<ColumnSchema>) -> Self {
        Self { name, columns }
    }

    /// Returns the table identifier.
    pub fn name(&self) -> &TableName {
        &self.name
    }

    /// Returns the columns in declaration order.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Finds a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name() == name)
    }
}
