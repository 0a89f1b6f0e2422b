use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use tessera_core::{BooleanOperator, KeyStream, Result, RowKey, VecStream};

enum HandleState {
    Open(Box<dyn KeyStream>),
    Closed,
}

/// Clonable handle over one open row-key stream.
///
/// The controller records the same per-expression stream it hands to the
/// merge builder, so the stream needs shared ownership: the merge side pulls
/// keys through the handle while the session's resource tracking closes it.
/// Closing is idempotent, and a closed handle reads as exhausted.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<Mutex<HandleState>>,
}

impl StreamHandle {
    #[must_use]
    pub fn new(stream: Box<dyn KeyStream>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleState::Open(stream))),
        }
    }

    /// Next key from the underlying stream; `None` once exhausted or
    /// closed.
    pub fn next_key(&self) -> Option<RowKey> {
        match &mut *self.inner.lock() {
            HandleState::Open(stream) => stream.next_key(),
            HandleState::Closed => None,
        }
    }

    /// Closes the underlying stream. The second and later calls are no-ops.
    pub fn close(&self) -> Result<()> {
        let state = std::mem::replace(&mut *self.inner.lock(), HandleState::Closed);
        match state {
            HandleState::Open(mut stream) => stream.close(),
            HandleState::Closed => Ok(()),
        }
    }
}

impl KeyStream for StreamHandle {
    fn next_key(&mut self) -> Option<RowKey> {
        StreamHandle::next_key(self)
    }

    fn close(&mut self) -> Result<()> {
        StreamHandle::close(self)
    }
}

/// Closes every handle, swallowing close errors so one failure never stops
/// the rest of the release.
pub(crate) fn release_streams(streams: &[StreamHandle]) {
    for stream in streams {
        if let Err(error) = stream.close() {
            warn!(%error, "failed to close index stream");
        }
    }
}

/// Builder combining per-expression streams into one merged iterator.
///
/// Union produces the sorted, de-duplicated union of its children;
/// intersection produces their sorted conjunction. The builder with no
/// children finalizes into an empty stream.
pub struct MergeBuilder {
    operator: BooleanOperator,
    children: Vec<StreamHandle>,
}

impl MergeBuilder {
    /// Union (OR) merge builder.
    #[must_use]
    pub fn union() -> Self {
        Self::new(BooleanOperator::Or)
    }

    /// Intersection (AND) merge builder.
    #[must_use]
    pub fn intersection() -> Self {
        Self::new(BooleanOperator::And)
    }

    /// Builder matching the boolean combinator.
    #[must_use]
    pub fn new(operator: BooleanOperator) -> Self {
        Self {
            operator,
            children: Vec::new(),
        }
    }

    /// Adds one child stream.
    pub fn add(&mut self, child: StreamHandle) {
        self.children.push(child);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Finalizes into a single merged stream.
    #[must_use]
    pub fn build(self) -> Box<dyn KeyStream> {
        if self.children.is_empty() {
            return Box::new(VecStream::empty());
        }
        match self.operator {
            BooleanOperator::Or => Box::new(UnionStream::new(self.children)),
            BooleanOperator::And => Box::new(IntersectionStream::new(self.children)),
        }
    }

    /// Releases unconsumed children without finalizing, best-effort.
    pub fn release(self) {
        release_streams(&self.children);
    }
}

/// Merges per-expression streams for one expression: memtable results plus
/// per-segment results, or `None` when every source is empty — absence
/// instead of a no-op merge node.
#[must_use]
pub(crate) fn union_of(mut children: Vec<StreamHandle>) -> Option<StreamHandle> {
    match children.len() {
        0 => None,
        1 => children.pop(),
        _ => {
            let mut builder = MergeBuilder::union();
            for child in children {
                builder.add(child);
            }
            Some(StreamHandle::new(builder.build()))
        }
    }
}

/// Sorted, de-duplicated union of child streams.
struct UnionStream {
    children: Vec<StreamHandle>,
    heads: Vec<Option<RowKey>>,
    primed: bool,
}

impl UnionStream {
    fn new(children: Vec<StreamHandle>) -> Self {
        let heads = vec![None; children.len()];
        Self {
            children,
            heads,
            primed: false,
        }
    }

    fn prime(&mut self) {
        if !self.primed {
            for (i, child) in self.children.iter().enumerate() {
                self.heads[i] = child.next_key();
            }
            self.primed = true;
        }
    }
}

impl KeyStream for UnionStream {
    fn next_key(&mut self) -> Option<RowKey> {
        self.prime();

        let smallest = self
            .heads
            .iter()
            .filter_map(|head| head.as_ref())
            .min()
            .cloned()?;

        for (i, child) in self.children.iter().enumerate() {
            if self.heads[i].as_ref() == Some(&smallest) {
                self.heads[i] = child.next_key();
            }
        }
        Some(smallest)
    }

    fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        for child in &self.children {
            if let Err(error) = child.close() {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Sorted conjunction of child streams.
struct IntersectionStream {
    children: Vec<StreamHandle>,
    heads: Vec<Option<RowKey>>,
    primed: bool,
}

impl IntersectionStream {
    fn new(children: Vec<StreamHandle>) -> Self {
        let heads = vec![None; children.len()];
        Self {
            children,
            heads,
            primed: false,
        }
    }

    fn prime(&mut self) {
        if !self.primed {
            for (i, child) in self.children.iter().enumerate() {
                self.heads[i] = child.next_key();
            }
            self.primed = true;
        }
    }
}

impl KeyStream for IntersectionStream {
    fn next_key(&mut self) -> Option<RowKey> {
        self.prime();

        loop {
            let target = {
                let mut heads = self.heads.iter();
                let mut target = heads.next()?.clone()?;
                for head in heads {
                    let head = head.as_ref()?;
                    if *head > target {
                        target = head.clone();
                    }
                }
                target
            };

            let mut aligned = true;
            for (i, child) in self.children.iter().enumerate() {
                while matches!(&self.heads[i], Some(head) if *head < target) {
                    self.heads[i] = child.next_key();
                }
                match &self.heads[i] {
                    Some(head) if *head == target => {}
                    Some(_) => aligned = false,
                    None => return None,
                }
            }

            if aligned {
                for (i, child) in self.children.iter().enumerate() {
                    self.heads[i] = child.next_key();
                }
                return Some(target);
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        for child in &self.children {
            if let Err(error) = child.close() {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::stream::collect;

    use super::*;

    fn handle(keys: &[&str]) -> StreamHandle {
        StreamHandle::new(Box::new(VecStream::new(
            keys.iter().map(|k| RowKey::from(*k)).collect(),
        )))
    }

    fn build(operator: BooleanOperator, inputs: &[&[&str]]) -> Vec<RowKey> {
        let mut builder = MergeBuilder::new(operator);
        for keys in inputs {
            builder.add(handle(keys));
        }
        collect(&mut *builder.build())
    }

    #[test]
    fn union_dedups_across_children() {
        assert_eq!(
            build(BooleanOperator::Or, &[&["1", "3"], &["2", "3"]]),
            vec![RowKey::from("1"), RowKey::from("2"), RowKey::from("3")]
        );
    }

    #[test]
    fn intersection_keeps_common_keys() {
        assert_eq!(
            build(BooleanOperator::And, &[&["1", "3"], &["2", "3"]]),
            vec![RowKey::from("3")]
        );
    }

    #[test]
    fn intersection_with_disjoint_children_is_empty() {
        assert!(build(BooleanOperator::And, &[&["1"], &["2"]]).is_empty());
    }

    #[test]
    fn empty_builder_finalizes_to_empty_stream() {
        assert!(build(BooleanOperator::Or, &[]).is_empty());
        assert!(build(BooleanOperator::And, &[]).is_empty());
    }

    #[test]
    fn closed_handle_reads_as_exhausted() {
        let stream = handle(&["1", "2"]);
        assert_eq!(stream.next_key(), Some(RowKey::from("1")));
        stream.close().unwrap();
        stream.close().unwrap();
        assert_eq!(stream.next_key(), None);
    }

    #[test]
    fn union_of_absent_when_no_children() {
        assert!(union_of(Vec::new()).is_none());
        assert!(union_of(vec![handle(&["1"])]).is_some());
    }
}
