use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tessera_core::{Operator, Term};

use crate::column_index::ColumnIndex;

/// Predicate over one column.
///
/// Identity is value-based over `(column, operator, value)`; two expressions
/// with the same predicate are interchangeable as map keys regardless of
/// which `ColumnIndex` handle they carry.
#[derive(Clone)]
pub struct Expression {
    column: String,
    operator: Operator,
    value: Term,
    index: Option<Arc<ColumnIndex>>,
}

impl Expression {
    /// Predicate over a non-indexed column; evaluated only by row-level
    /// post-filtering.
    #[must_use]
    pub fn new(column: impl Into<String>, operator: Operator, value: Term) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            index: None,
        }
    }

    /// Predicate over an indexed column.
    #[must_use]
    pub fn indexed(
        column: impl Into<String>,
        operator: Operator,
        value: Term,
        index: Arc<ColumnIndex>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            index: Some(index),
        }
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub fn value(&self) -> &Term {
        &self.value
    }

    /// The column's index, absent when the column is not indexed.
    #[must_use]
    pub fn index(&self) -> Option<&Arc<ColumnIndex>> {
        self.index.as_ref()
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column
            && self.operator == other.operator
            && self.value == other.value
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.column.hash(state);
        self.operator.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("column", &self.column)
            .field("operator", &self.operator)
            .field("value", &self.value)
            .field("indexed", &self.is_indexed())
            .finish()
    }
}
