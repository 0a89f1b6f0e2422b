use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use tessera_core::{BooleanOperator, Error, QueryId, Result};
use tessera_index::{Expression, MemtableIndex, Segment};

use crate::merge::{release_streams, union_of, MergeBuilder, StreamHandle};
use crate::scope::FileScope;
use crate::store::{EntityStore, QueryFilter};

/// The exact predicate collection of one planning step; the unit of
/// resource tracking. Order-sensitive: the caller plans each operator node's
/// expression list as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PredicateGroup(Vec<Expression>);

/// Per-query planning session.
///
/// Constructed once per query with a time budget; pins the data files in
/// the query's key range, plans one merged iterator per predicate group,
/// and guarantees that every opened iterator and every pinned file
/// reference is released exactly once no matter how the query ends —
/// normal exhaustion, quota cancellation, or error. Sessions are
/// single-threaded by contract.
pub struct QueryController {
    query_id: QueryId,
    store: Arc<dyn EntityStore>,
    quota: Duration,
    started: Instant,
    scope: Option<FileScope>,
    resources: HashMap<PredicateGroup, Vec<StreamHandle>>,
}

impl QueryController {
    /// Opens a session: pins the query scope from the filter's key range
    /// and starts the execution clock.
    pub fn new(
        store: Arc<dyn EntityStore>,
        filter: &QueryFilter,
        quota: Duration,
    ) -> Result<Self> {
        let scope = FileScope::pin(store.clone(), &filter.range)?;
        let query_id = QueryId::new();
        debug!(%query_id, files = scope.len(), ?quota, "opened query session");
        Ok(Self {
            query_id,
            store,
            quota,
            started: Instant::now(),
            scope: Some(scope),
            resources: HashMap::new(),
        })
    }

    /// Session identifier, for log correlation.
    #[must_use]
    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// Configured execution quota.
    #[must_use]
    pub fn quota(&self) -> Duration {
        self.quota
    }

    /// Wall-clock time since the session opened.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The pinned query scope; `None` once the session has finished.
    #[must_use]
    pub fn scope(&self) -> Option<&FileScope> {
        self.scope.as_ref()
    }

    /// Builds a merged row iterator for one predicate collection combined
    /// with `operator`.
    ///
    /// Index searches opened here are recorded under the collection's key
    /// and can be released early via [`QueryController::release`]; whatever
    /// remains is released by [`QueryController::finish`]. The returned
    /// builder is not yet finalized; the caller adds nothing further and
    /// calls `build` to consume it.
    ///
    /// # Errors
    ///
    /// `GroupAlreadyPlanned` when this exact collection was planned before
    /// in this session — planning is single-use per group, a second plan
    /// would leak the first registration. Storage errors propagate after
    /// everything opened by the failing call has been closed again.
    pub fn plan(
        &mut self,
        operator: BooleanOperator,
        expressions: &[Expression],
    ) -> Result<MergeBuilder> {
        let group = PredicateGroup(expressions.to_vec());
        if self.resources.contains_key(&group) {
            return Err(Error::GroupAlreadyPlanned);
        }
        let Some(scope) = self.scope.as_ref() else {
            return Err(Error::internal("query session already finished"));
        };

        let memtable = self.store.memtable();
        let mut builder = match operator {
            BooleanOperator::Or => MergeBuilder::union(),
            BooleanOperator::And => MergeBuilder::intersection(),
        };
        let mut opened = Vec::new();

        for (expression, segments) in Self::candidates(scope, operator, expressions) {
            match Self::open_expression_union(memtable.as_ref(), &expression, &segments) {
                Ok(Some(merged)) => {
                    builder.add(merged.clone());
                    opened.push(merged);
                }
                Ok(None) => {}
                Err(error) => {
                    release_streams(&opened);
                    return Err(error);
                }
            }
        }

        debug!(
            query_id = %self.query_id,
            ?operator,
            expressions = expressions.len(),
            iterators = opened.len(),
            "planned predicate group"
        );
        self.resources.insert(group, opened);
        Ok(builder)
    }

    /// Cooperative cancellation check.
    ///
    /// Callers poll this at every consumption batch boundary; there is no
    /// preemptive cancellation, so a caller that never checks is never
    /// cancelled on time.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` once elapsed wall-clock time reaches the quota.
    pub fn checkpoint(&self) -> Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.quota {
            return Err(Error::QuotaExceeded {
                quota: self.quota,
                elapsed,
            });
        }
        Ok(())
    }

    /// Releases every iterator recorded for this exact predicate
    /// collection. Unknown or already-released collections are a no-op;
    /// close failures are swallowed so release never disturbs the query
    /// outcome.
    pub fn release(&mut self, expressions: &[Expression]) {
        if let Some(streams) = self.resources.remove(&PredicateGroup(expressions.to_vec())) {
            release_streams(&streams);
        }
    }

    /// Ends the session: releases every remaining resource group, then the
    /// pinned query scope, each exactly once. Dropping the controller takes
    /// the same path, so early exits are covered.
    pub fn finish(&mut self) {
        for (_, streams) in self.resources.drain() {
            release_streams(&streams);
        }
        if let Some(scope) = self.scope.take() {
            debug!(query_id = %self.query_id, "released query scope");
            scope.release();
        }
    }

    /// Candidate segment set per eligible expression.
    ///
    /// Non-indexed and inequality expressions are excluded entirely; they
    /// are row-filter territory and must not open index searches. For AND
    /// groups, every non-primary expression's candidates are bounded by the
    /// primary's matched key footprint: rows outside the most selective
    /// predicate's key interval cannot satisfy the conjunction, so the
    /// other predicates never search segments there.
    fn candidates(
        scope: &FileScope,
        operator: BooleanOperator,
        expressions: &[Expression],
    ) -> Vec<(Expression, Vec<Segment>)> {
        let primary = match operator {
            BooleanOperator::And => Self::select_primary(scope, expressions),
            BooleanOperator::Or => None,
        };

        let mut out = Vec::new();
        for expression in expressions {
            if !expression.is_indexed() || !expression.operator().supports_indexing() {
                continue;
            }

            if let Some((primary_expr, primary_segments)) = &primary {
                if expression == primary_expr {
                    out.push((expression.clone(), primary_segments.clone()));
                    continue;
                }
            }

            let Some(index) = expression.index() else {
                continue;
            };
            let view = index.view();

            let segments = match &primary {
                Some((_, primary_segments)) if !primary_segments.is_empty() => {
                    let mut seen = HashSet::new();
                    let mut narrowed = Vec::new();
                    for primary_segment in primary_segments {
                        for candidate in
                            view.match_key_range(primary_segment.min_key(), primary_segment.max_key())
                        {
                            if seen.insert(candidate.data_file()) {
                                narrowed.push(candidate);
                            }
                        }
                    }
                    narrowed
                }
                _ => view.match_expression(scope.files(), expression),
            };

            out.push((expression.clone(), segments));
        }
        out
    }

    /// Selects the AND group's primary predicate: the indexed, indexable
    /// expression whose directly-matched segment set is smallest, first
    /// occurrence winning ties. An empty matched set compares like any
    /// other size.
    fn select_primary(
        scope: &FileScope,
        expressions: &[Expression],
    ) -> Option<(Expression, Vec<Segment>)> {
        let mut best: Option<(Expression, Vec<Segment>)> = None;

        for expression in expressions {
            if !expression.is_indexed() || !expression.operator().supports_indexing() {
                continue;
            }
            let Some(index) = expression.index() else {
                continue;
            };

            let matched = index.view().match_expression(scope.files(), expression);
            let better = match &best {
                Some((_, current)) => matched.len() < current.len(),
                None => true,
            };
            if better {
                best = Some((expression.clone(), matched));
            }
        }

        if let Some((expression, matched)) = &best {
            debug!(
                column = expression.column(),
                candidates = matched.len(),
                "selected primary predicate"
            );
        }
        best
    }

    fn open_expression_union(
        memtable: &dyn MemtableIndex,
        expression: &Expression,
        segments: &[Segment],
    ) -> Result<Option<StreamHandle>> {
        let mut children = Vec::new();

        if let Some(stream) = memtable.search(expression)? {
            children.push(StreamHandle::new(stream));
        }

        for segment in segments {
            match segment.search(expression) {
                Ok(Some(stream)) => children.push(StreamHandle::new(stream)),
                Ok(None) => {}
                Err(error) => {
                    release_streams(&children);
                    return Err(error);
                }
            }
        }

        Ok(union_of(children))
    }
}

impl Drop for QueryController {
    fn drop(&mut self) {
        self.finish();
    }
}
