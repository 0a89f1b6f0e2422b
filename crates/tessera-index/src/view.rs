use std::collections::{HashMap, HashSet};

use tracing::debug;

use tessera_core::{ColumnSemantics, DataFileId, Error, Result, RowKey};

use crate::expression::Expression;
use crate::interval::{Interval, IntervalTree};
use crate::segment::Segment;
use crate::term_tree::{TermTree, TermTreeBuilder};

/// Immutable snapshot of the index segments visible for one column.
///
/// Built once and replaced wholesale on every mutation; concurrent readers
/// keep whichever snapshot they captured. Candidate lookup goes through two
/// structures built from the same segment set: the term structure for
/// predicate matching and the key-interval structure for key-range matching.
pub struct View {
    segments: HashMap<DataFileId, Segment>,
    term_tree: TermTree,
    key_intervals: IntervalTree<RowKey, Segment>,
}

impl View {
    /// Snapshot with no segments.
    #[must_use]
    pub fn empty(semantics: ColumnSemantics) -> Self {
        Self {
            segments: HashMap::new(),
            term_tree: TermTreeBuilder::new(semantics).build(),
            key_intervals: IntervalTree::build(Vec::new()),
        }
    }

    /// Merges the previous snapshot's segments with newly available ones
    /// into a fresh snapshot.
    ///
    /// The result contains `(previous ∪ fresh) − (dropped ∪ superseded)`,
    /// de-duplicated by data-file identity with the first occurrence
    /// winning. Every excluded handle — dropped, superseded, or duplicate —
    /// is released here, exactly once.
    ///
    /// # Errors
    ///
    /// `InconsistentView` when the term structure and the key-interval
    /// structure disagree on interval counts; the snapshot is discarded and
    /// every handle it was incorporating is released.
    pub fn build(
        semantics: ColumnSemantics,
        previous: Vec<Segment>,
        dropped: &HashSet<DataFileId>,
        fresh: Vec<Segment>,
    ) -> Result<Self> {
        let mut segments = HashMap::new();
        let mut term_builder = TermTreeBuilder::new(semantics);
        let mut key_intervals = Vec::new();

        for segment in previous.into_iter().chain(fresh) {
            let data_file = segment.data_file();
            if dropped.contains(&data_file)
                || segment.is_superseded()
                || segments.contains_key(&data_file)
            {
                // excluded handle released here
                continue;
            }

            term_builder.add(&segment);
            key_intervals.push(Interval::new(
                segment.min_key().clone(),
                segment.max_key().clone(),
                segment.clone(),
            ));
            segments.insert(data_file, segment);
        }

        let term_tree = term_builder.build();
        let key_intervals = IntervalTree::build(key_intervals);

        if key_intervals.interval_count() != term_tree.interval_count() {
            return Err(Error::InconsistentView {
                key_intervals: key_intervals.interval_count(),
                term_intervals: term_tree.interval_count(),
            });
        }

        debug!(segments = segments.len(), "built index view snapshot");

        Ok(Self {
            segments,
            term_tree,
            key_intervals,
        })
    }

    /// Segments that could contain matches for `expression`, restricted to
    /// data files inside the caller's pinned `scope`.
    ///
    /// The scope filter keeps a query inside its consistent read scope even
    /// when this snapshot is newer than the scope it pinned.
    #[must_use]
    pub fn match_expression(
        &self,
        scope: &HashSet<DataFileId>,
        expression: &Expression,
    ) -> Vec<Segment> {
        self.term_tree
            .search(expression)
            .into_iter()
            .filter(|segment| scope.contains(&segment.data_file()))
            .collect()
    }

    /// Segments whose key interval overlaps `[min, max]`, boundaries
    /// inclusive, unfiltered by scope.
    #[must_use]
    pub fn match_key_range(&self, min: &RowKey, max: &RowKey) -> Vec<Segment> {
        self.key_intervals.search_overlap(min, max)
    }

    /// All segments in the snapshot.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Number of segments in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use tessera_core::{KeyStream, Operator, Term};

    use super::*;
    use crate::segment::{SegmentMeta, SegmentSearcher};

    struct TrackingSearcher {
        closes: Arc<AtomicUsize>,
    }

    impl SegmentSearcher for TrackingSearcher {
        fn search(&self, _expression: &Expression) -> tessera_core::Result<Option<Box<dyn KeyStream>>> {
            Ok(None)
        }

        fn close(&mut self) -> tessera_core::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn tracked_segment(
        min_key: &str,
        max_key: &str,
        min_term: &str,
        max_term: &str,
    ) -> (Segment, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let segment = Segment::new(
            SegmentMeta {
                data_file: DataFileId::new(),
                min_key: RowKey::from(min_key),
                max_key: RowKey::from(max_key),
                min_term: Term::from(min_term),
                max_term: Term::from(max_term),
                created_at: Utc::now(),
            },
            Box::new(TrackingSearcher {
                closes: closes.clone(),
            }),
        );
        (segment, closes)
    }

    fn file_set(view: &View) -> HashSet<DataFileId> {
        view.segments().map(Segment::data_file).collect()
    }

    #[test]
    fn merge_is_union_minus_drops() {
        let (a, _) = tracked_segment("a", "f", "ant", "bee");
        let (b, _) = tracked_segment("g", "m", "cat", "dog");
        let (c, _) = tracked_segment("n", "z", "elk", "fox");

        let dropped = HashSet::from([b.data_file()]);
        let view = View::build(
            ColumnSemantics::Textual,
            vec![a.clone(), b.clone()],
            &dropped,
            vec![c.clone()],
        )
        .unwrap();

        assert_eq!(
            file_set(&view),
            HashSet::from([a.data_file(), c.data_file()])
        );
    }

    #[test]
    fn excluded_segments_are_released_exactly_once() {
        let (kept, kept_closes) = tracked_segment("a", "f", "ant", "bee");
        let (dropped_seg, dropped_closes) = tracked_segment("g", "m", "cat", "dog");
        let (superseded, superseded_closes) = tracked_segment("n", "z", "elk", "fox");
        superseded.mark_superseded();

        let dropped = HashSet::from([dropped_seg.data_file()]);
        let view = View::build(
            ColumnSemantics::Textual,
            vec![kept.clone(), dropped_seg, superseded],
            &dropped,
            Vec::new(),
        )
        .unwrap();

        // the view's clone was the only remaining holder of the excluded
        // handles; the kept segment stays open
        assert_eq!(dropped_closes.load(Ordering::SeqCst), 1);
        assert_eq!(superseded_closes.load(Ordering::SeqCst), 1);
        assert_eq!(kept_closes.load(Ordering::SeqCst), 0);

        drop(view);
        drop(kept);
        assert_eq!(kept_closes.load(Ordering::SeqCst), 1);
        assert_eq!(dropped_closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_data_file_keeps_first_occurrence() {
        let (first, first_closes) = tracked_segment("a", "f", "ant", "bee");
        let duplicate = first.clone();

        let view = View::build(
            ColumnSemantics::Textual,
            vec![first.clone()],
            &HashSet::new(),
            vec![duplicate],
        )
        .unwrap();

        assert_eq!(view.len(), 1);
        // duplicate handle released, segment itself still open
        assert_eq!(first_closes.load(Ordering::SeqCst), 0);
        assert_eq!(first.reference_count(), 2);
        drop(view);
        assert_eq!(first.reference_count(), 1);
    }

    #[test]
    fn inconsistent_interval_counts_abort_construction() {
        // inverted term bounds never reach the term structure, so the two
        // structures disagree and the build must fail
        let (malformed, closes) = tracked_segment("a", "f", "zebra", "ant");

        let result = View::build(
            ColumnSemantics::Ordered,
            Vec::new(),
            &HashSet::new(),
            vec![malformed],
        );

        assert!(matches!(
            result,
            Err(Error::InconsistentView {
                key_intervals: 1,
                term_intervals: 0
            })
        ));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn key_range_match_is_inclusive() {
        let (a, _) = tracked_segment("\x01", "\x0a", "cat", "dog");
        let (b, _) = tracked_segment("\x0b", "\x14", "ant", "bee");

        let view = View::build(
            ColumnSemantics::Textual,
            Vec::new(),
            &HashSet::new(),
            vec![a.clone(), b.clone()],
        )
        .unwrap();

        let both = view.match_key_range(&RowKey::from("\x05"), &RowKey::from("\x0f"));
        assert_eq!(both.len(), 2);

        let only_a = view.match_key_range(&RowKey::from("\x01"), &RowKey::from("\x05"));
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].data_file(), a.data_file());
    }

    #[test]
    fn expression_match_respects_scope() {
        let (a, _) = tracked_segment("a", "f", "cat", "dog");
        let (b, _) = tracked_segment("g", "m", "cat", "dog");

        let view = View::build(
            ColumnSemantics::Textual,
            Vec::new(),
            &HashSet::new(),
            vec![a.clone(), b.clone()],
        )
        .unwrap();

        let expr = Expression::new("c", Operator::Eq, Term::from("cow"));
        let scope = HashSet::from([a.data_file()]);
        let matched = view.match_expression(&scope, &expr);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].data_file(), a.data_file());
    }
}
