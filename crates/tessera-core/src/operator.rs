use serde::{Deserialize, Serialize};

/// Predicate operator over one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equality match.
    Eq,
    /// Inequality; never served from the index, only by row-level
    /// post-filtering.
    NotEq,
    /// Strictly less than the operand.
    Lt,
    /// Less than or equal to the operand.
    Lte,
    /// Strictly greater than the operand.
    Gt,
    /// Greater than or equal to the operand.
    Gte,
    /// Textual prefix match.
    Prefix,
    /// Textual containment match.
    Contains,
}

impl Operator {
    /// Whether expressions with this operator participate in index-based
    /// planning. `NotEq` would scan nearly the whole index, so it acts only
    /// as a row-level filter.
    #[must_use]
    pub fn supports_indexing(self) -> bool {
        !matches!(self, Self::NotEq)
    }
}

/// Boolean combinator applied to one predicate collection at one planning
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOperator {
    /// Conjunction; planned with an intersection merge.
    And,
    /// Disjunction; planned with a union merge.
    Or,
}
