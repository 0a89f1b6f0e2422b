use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use tessera_core::{ColumnSemantics, DataFileId, Result};

use crate::segment::Segment;
use crate::view::View;

/// Per-column handle publishing the current view snapshot.
///
/// Readers capture an `Arc<View>` and keep it for the duration of their
/// query; updates build a replacement snapshot under the write lock (which
/// serializes writers with each other) and publish it atomically. In-flight
/// readers are never blocked by an update and never observe a half-built
/// snapshot.
pub struct ColumnIndex {
    name: String,
    semantics: ColumnSemantics,
    view: RwLock<Arc<View>>,
}

impl ColumnIndex {
    /// Creates the column's index with an empty view.
    #[must_use]
    pub fn new(name: impl Into<String>, semantics: ColumnSemantics) -> Self {
        Self {
            name: name.into(),
            semantics,
            view: RwLock::new(Arc::new(View::empty(semantics))),
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Comparison semantics resolved from the column's type metadata.
    #[must_use]
    pub fn semantics(&self) -> ColumnSemantics {
        self.semantics
    }

    /// Current snapshot. The caller keeps this reference for its whole
    /// query; later updates do not affect it.
    #[must_use]
    pub fn view(&self) -> Arc<View> {
        self.view.read().clone()
    }

    /// Publishes the initial segment set.
    pub fn initialize(&self, fresh: Vec<Segment>) -> Result<()> {
        self.update(&HashSet::new(), fresh)
    }

    /// Replaces the snapshot with one merged from the previous segments,
    /// minus `dropped`, plus `fresh`.
    ///
    /// # Errors
    ///
    /// Propagates the view construction failure; the previous snapshot
    /// stays published.
    pub fn update(&self, dropped: &HashSet<DataFileId>, fresh: Vec<Segment>) -> Result<()> {
        let mut guard = self.view.write();
        let previous: Vec<Segment> = guard.segments().cloned().collect();
        let next = View::build(self.semantics, previous, dropped, fresh)?;
        debug!(column = %self.name, segments = next.len(), "published view snapshot");
        *guard = Arc::new(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tessera_core::{KeyStream, RowKey, Term};

    use super::*;
    use crate::expression::Expression;
    use crate::segment::{SegmentMeta, SegmentSearcher};

    struct NullSearcher;

    impl SegmentSearcher for NullSearcher {
        fn search(&self, _expression: &Expression) -> Result<Option<Box<dyn KeyStream>>> {
            Ok(None)
        }
    }

    fn segment(min_key: &str, max_key: &str) -> Segment {
        Segment::new(
            SegmentMeta {
                data_file: DataFileId::new(),
                min_key: RowKey::from(min_key),
                max_key: RowKey::from(max_key),
                min_term: Term::from("ant"),
                max_term: Term::from("dog"),
                created_at: Utc::now(),
            },
            Box::new(NullSearcher),
        )
    }

    #[test]
    fn readers_keep_their_captured_snapshot() {
        let index = ColumnIndex::new("name", ColumnSemantics::Textual);
        let a = segment("a", "f");
        index.initialize(vec![a.clone()]).unwrap();

        let captured = index.view();
        assert_eq!(captured.len(), 1);

        let b = segment("g", "m");
        index
            .update(&HashSet::from([a.data_file()]), vec![b.clone()])
            .unwrap();

        // the captured snapshot still sees the old segment set
        assert_eq!(captured.len(), 1);
        assert!(captured.segments().any(|s| s.data_file() == a.data_file()));

        let current = index.view();
        assert_eq!(current.len(), 1);
        assert!(current.segments().any(|s| s.data_file() == b.data_file()));
    }
}
