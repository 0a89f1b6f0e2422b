use tessera_core::{ColumnSemantics, Operator, Term};

use crate::expression::Expression;
use crate::interval::{Interval, IntervalTree};
use crate::segment::Segment;

/// Lookup structure mapping a term predicate to the segments whose term
/// range could contain a match.
///
/// The variant is selected by the column's comparison semantics: textual
/// columns get prefix-aware matching, ordered columns get plain range
/// matching. Candidate sets are conservative supersets; the per-segment term
/// search decides actual membership.
pub enum TermTree {
    Prefix(PrefixTermTree),
    Range(RangeTermTree),
}

impl TermTree {
    /// Segments whose term interval could contain a match for `expression`.
    #[must_use]
    pub fn search(&self, expression: &Expression) -> Vec<Segment> {
        match self {
            Self::Prefix(tree) => tree.search(expression),
            Self::Range(tree) => tree.search(expression),
        }
    }

    /// Number of term intervals held, one per indexed segment.
    #[must_use]
    pub fn interval_count(&self) -> usize {
        match self {
            Self::Prefix(tree) => tree.terms.interval_count(),
            Self::Range(tree) => tree.terms.interval_count(),
        }
    }
}

/// Term structure for columns with ordered comparison semantics.
///
/// Serves equality and range predicates from the interval index. Textual
/// predicates cannot be bounded by an ordered term range, so they fall back
/// to the full candidate set.
pub struct RangeTermTree {
    terms: IntervalTree<Term, Segment>,
}

impl RangeTermTree {
    fn search(&self, expression: &Expression) -> Vec<Segment> {
        let value = expression.value();
        match expression.operator() {
            Operator::Eq => self.terms.search_overlap(value, value),
            Operator::Lt | Operator::Lte => self.terms.search_to(value),
            Operator::Gt | Operator::Gte => self.terms.search_from(value),
            Operator::Prefix | Operator::Contains | Operator::NotEq => self.terms.values(),
        }
    }
}

/// Term structure for columns with textual comparison semantics.
///
/// Adds prefix awareness on top of range matching: a prefix predicate covers
/// the term interval `[p, p ++ 0xFF]`. Containment cannot be bounded by any
/// term interval and falls back to the full candidate set.
pub struct PrefixTermTree {
    terms: IntervalTree<Term, Segment>,
}

impl PrefixTermTree {
    fn search(&self, expression: &Expression) -> Vec<Segment> {
        let value = expression.value();
        match expression.operator() {
            Operator::Eq => self.terms.search_overlap(value, value),
            Operator::Lt | Operator::Lte => self.terms.search_to(value),
            Operator::Gt | Operator::Gte => self.terms.search_from(value),
            Operator::Prefix => self
                .terms
                .search_overlap(value, &value.prefix_upper_bound()),
            Operator::Contains | Operator::NotEq => self.terms.values(),
        }
    }
}

/// Builder accumulating one term interval per segment.
pub struct TermTreeBuilder {
    semantics: ColumnSemantics,
    intervals: Vec<Interval<Term, Segment>>,
}

impl TermTreeBuilder {
    #[must_use]
    pub fn new(semantics: ColumnSemantics) -> Self {
        Self {
            semantics,
            intervals: Vec::new(),
        }
    }

    /// Records the segment's term interval. A segment whose term bounds are
    /// inverted carries no indexed terms and is not recorded; the view's
    /// interval-count invariant turns such a segment into a construction
    /// failure.
    pub fn add(&mut self, segment: &Segment) {
        let min = segment.min_term().clone();
        let max = segment.max_term().clone();
        if min > max {
            return;
        }
        self.intervals.push(Interval::new(min, max, segment.clone()));
    }

    #[must_use]
    pub fn build(self) -> TermTree {
        let terms = IntervalTree::build(self.intervals);
        match self.semantics {
            ColumnSemantics::Textual => TermTree::Prefix(PrefixTermTree { terms }),
            ColumnSemantics::Ordered => TermTree::Range(RangeTermTree { terms }),
        }
    }
}
