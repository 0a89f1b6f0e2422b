//! View snapshot lifecycle at the public API level: initialize, update with
//! drops and compaction, candidate lookup.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;

use tessera_core::{
    ColumnSemantics, DataFileId, KeyStream, Operator, Result, RowKey, Term,
};
use tessera_index::{ColumnIndex, Expression, Segment, SegmentMeta, SegmentSearcher};

struct TrackingSearcher {
    closes: Arc<AtomicUsize>,
}

impl SegmentSearcher for TrackingSearcher {
    fn search(&self, _expression: &Expression) -> Result<Option<Box<dyn KeyStream>>> {
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn segment(
    key_range: (&str, &str),
    term_range: (&str, &str),
) -> (Segment, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let segment = Segment::new(
        SegmentMeta {
            data_file: DataFileId::new(),
            min_key: RowKey::from(key_range.0),
            max_key: RowKey::from(key_range.1),
            min_term: Term::from(term_range.0),
            max_term: Term::from(term_range.1),
            created_at: Utc::now(),
        },
        Box::new(TrackingSearcher {
            closes: closes.clone(),
        }),
    );
    (segment, closes)
}

fn data_files(segments: &[Segment]) -> HashSet<DataFileId> {
    segments.iter().map(Segment::data_file).collect()
}

/// Segment A covers keys 01-10 with terms cat..dog, segment B covers keys
/// 11-20 with terms ant..bee. A key query spanning both returns both; a
/// query inside A's interval returns A only.
#[test]
fn key_range_lookup_scenario() {
    let (a, _) = segment(("01", "10"), ("cat", "dog"));
    let (b, _) = segment(("11", "20"), ("ant", "bee"));

    let index = ColumnIndex::new("name", ColumnSemantics::Textual);
    index.initialize(vec![a.clone(), b.clone()]).unwrap();
    let view = index.view();

    let both = view.match_key_range(&RowKey::from("05"), &RowKey::from("15"));
    assert_eq!(data_files(&both), data_files(&[a.clone(), b.clone()]));

    let only_a = view.match_key_range(&RowKey::from("01"), &RowKey::from("05"));
    assert_eq!(data_files(&only_a), data_files(&[a]));
}

#[test]
fn term_lookup_filters_by_scope() {
    let (a, _) = segment(("01", "10"), ("cat", "dog"));
    let (b, _) = segment(("11", "20"), ("ant", "bee"));

    let index = ColumnIndex::new("name", ColumnSemantics::Textual);
    index.initialize(vec![a.clone(), b.clone()]).unwrap();
    let view = index.view();

    let expr = Expression::new("name", Operator::Eq, Term::from("bat"));
    let unscoped = view.match_expression(&data_files(&[a.clone(), b.clone()]), &expr);
    assert_eq!(data_files(&unscoped), data_files(&[b.clone()]));

    // same predicate with the matching file outside the pinned scope
    let scoped = view.match_expression(&data_files(&[a]), &expr);
    assert!(scoped.is_empty());
}

/// Updating the view drops superseded segments and releases every excluded
/// handle exactly once while readers keep their captured snapshot.
#[test]
fn update_releases_excluded_segments_once() {
    let (a, a_closes) = segment(("01", "10"), ("cat", "dog"));
    let (b, b_closes) = segment(("11", "20"), ("ant", "bee"));

    let index = ColumnIndex::new("name", ColumnSemantics::Textual);
    index.initialize(vec![a.clone(), b.clone()]).unwrap();
    let captured = index.view();

    // compaction replaces a's data file with c
    let (c, _) = segment(("01", "10"), ("cow", "fox"));
    a.mark_superseded();
    index
        .update(&HashSet::from([a.data_file()]), vec![c.clone()])
        .unwrap();

    let current = index.view();
    assert_eq!(data_files(&current.segments().cloned().collect::<Vec<_>>()),
               data_files(&[b.clone(), c]));

    // the captured snapshot still holds a's handle open
    assert_eq!(captured.len(), 2);
    assert_eq!(a_closes.load(Ordering::SeqCst), 0);

    // once the snapshot and the local handle go away, a closes exactly once
    drop(captured);
    drop(a);
    assert_eq!(a_closes.load(Ordering::SeqCst), 1);
    assert_eq!(b_closes.load(Ordering::SeqCst), 0);
}
