use std::collections::HashSet;
use std::sync::Arc;

use tessera_core::{DataFileId, KeyRange, Result, RowKey};
use tessera_index::{Expression, MemtableIndex};

/// Storage-engine surface the query controller plans against.
///
/// Implemented by the base entity store; the planning core only needs scope
/// pinning and memtable access from it.
pub trait EntityStore: Send + Sync {
    /// Returns the data files overlapping `range` with references held
    /// against concurrent removal. An empty result is valid.
    fn pin_scope(&self, range: &KeyRange) -> Result<HashSet<DataFileId>>;

    /// Bulk-releases previously pinned file references. Best-effort;
    /// implementations swallow per-file failures.
    fn release_scope(&self, files: &HashSet<DataFileId>);

    /// In-memory index over entries not yet flushed to segments.
    fn memtable(&self) -> Arc<dyn MemtableIndex>;
}

/// Row-level post-filter for predicates the index cannot serve: non-indexed
/// columns and inequality operators. Evaluated downstream of this core,
/// against candidate rows the merged iterators produce.
pub trait RowFilter: Send + Sync {
    /// Whether the row identified by `key` satisfies `expression`.
    fn satisfied_by(&self, key: &RowKey, expression: &Expression) -> Result<bool>;
}

/// One query's filter: the key range scoping the query plus its predicates.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub range: KeyRange,
    pub predicates: Vec<Expression>,
}

impl QueryFilter {
    #[must_use]
    pub fn new(range: KeyRange, predicates: Vec<Expression>) -> Self {
        Self { range, predicates }
    }
}
