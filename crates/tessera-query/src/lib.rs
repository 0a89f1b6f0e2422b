//! Per-query planning sessions for the tessera secondary index.
//!
//! A [`QueryController`] owns one query's planning session: it pins the data
//! files in the query's key range, computes candidate segments per
//! predicate, merges memtable and segment result streams into one iterator
//! per predicate group, enforces the wall-clock execution quota, and
//! releases every acquired resource exactly once however the query ends.

pub mod controller;
pub mod merge;
pub mod scope;
pub mod store;

pub use controller::QueryController;
pub use merge::{MergeBuilder, StreamHandle};
pub use scope::FileScope;
pub use store::{EntityStore, QueryFilter, RowFilter};
