//! Qualified names for column references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A possibly-qualified column name, e.g. `t.balance` or `balance`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Optional table/relation qualifier.
    pub qualifier: Option<String>,
    /// Column name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new unqualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Creates a new qualified name.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Returns the fully qualified form.
    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q, self.name),
            None => self.name.clone(),
        }
    }

    /// Returns true if this name refers to the given qualifier/column.
    ///
    /// An unqualified name matches a column under any qualifier; a
    /// qualified name matches only within its qualifier.
    pub fn matches(&self, qualifier: &str, column: &str) -> bool {
        if self.name != column {
            return false;
        }
        match &self.qualifier {
            Some(q) => q == qualifier,
            None => true,
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
