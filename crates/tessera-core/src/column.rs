use serde::{Deserialize, Serialize};

/// Comparison semantics of an indexed column.
///
/// Resolved from the column's type metadata by the storage engine; selects
/// which term-structure variant a column's view uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSemantics {
    /// Text-like values; predicates may match by prefix or containment.
    Textual,
    /// Values with a total order; predicates match by equality and range.
    Ordered,
}

impl ColumnSemantics {
    /// Whether the column supports textual prefix/containment matching.
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Textual)
    }
}
