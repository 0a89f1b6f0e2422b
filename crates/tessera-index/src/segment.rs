use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tessera_core::{DataFileId, KeyRange, KeyStream, Result, RowKey, Term};

use crate::expression::Expression;

/// Descriptor for one on-disk index segment.
///
/// A segment indexes exactly one stored data file; `min_key`/`max_key` bound
/// the row keys the data file covers and `min_term`/`max_term` bound the
/// indexed terms it contains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentMeta {
    pub data_file: DataFileId,
    pub min_key: RowKey,
    pub max_key: RowKey,
    pub min_term: Term,
    pub max_term: Term,
    pub created_at: DateTime<Utc>,
}

/// Term-search capability of one on-disk segment.
///
/// Implemented by the physical segment format (out of scope here); returns
/// `None` when the segment contains no matches for the expression. Closed
/// exactly once when the last [`Segment`] handle is dropped.
pub trait SegmentSearcher: Send + Sync {
    /// Searches the segment's terms, returning persisted matches as a sorted
    /// row-key stream.
    fn search(&self, expression: &Expression) -> Result<Option<Box<dyn KeyStream>>>;

    /// Releases the searcher's backing resources.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct SegmentInner {
    meta: SegmentMeta,
    superseded: AtomicBool,
    searcher: Box<dyn SegmentSearcher>,
}

impl Drop for SegmentInner {
    fn drop(&mut self) {
        if let Err(error) = self.searcher.close() {
            warn!(data_file = %self.meta.data_file, %error, "failed to close segment searcher");
        }
    }
}

/// Reference-counted handle to one on-disk index segment.
///
/// Cloning acquires a reference; dropping releases it. The backing searcher
/// is closed when the last handle is dropped, so excluding a segment from a
/// view snapshot releases it without touching handles other sessions still
/// hold.
#[derive(Clone)]
pub struct Segment {
    inner: Arc<SegmentInner>,
}

impl Segment {
    /// Wraps a searcher and its descriptor into a fresh handle.
    #[must_use]
    pub fn new(meta: SegmentMeta, searcher: Box<dyn SegmentSearcher>) -> Self {
        Self {
            inner: Arc::new(SegmentInner {
                meta,
                superseded: AtomicBool::new(false),
                searcher,
            }),
        }
    }

    /// Segment descriptor.
    #[must_use]
    pub fn meta(&self) -> &SegmentMeta {
        &self.inner.meta
    }

    /// Identity of the data file this segment indexes.
    #[must_use]
    pub fn data_file(&self) -> DataFileId {
        self.inner.meta.data_file
    }

    /// Smallest row key covered by the data file.
    #[must_use]
    pub fn min_key(&self) -> &RowKey {
        &self.inner.meta.min_key
    }

    /// Largest row key covered by the data file.
    #[must_use]
    pub fn max_key(&self) -> &RowKey {
        &self.inner.meta.max_key
    }

    /// Smallest indexed term.
    #[must_use]
    pub fn min_term(&self) -> &Term {
        &self.inner.meta.min_term
    }

    /// Largest indexed term.
    #[must_use]
    pub fn max_term(&self) -> &Term {
        &self.inner.meta.max_term
    }

    /// Key interval covered by the data file.
    #[must_use]
    pub fn key_range(&self) -> KeyRange {
        KeyRange::new(
            self.inner.meta.min_key.clone(),
            self.inner.meta.max_key.clone(),
        )
    }

    /// Searches the segment's terms for `expression`.
    pub fn search(&self, expression: &Expression) -> Result<Option<Box<dyn KeyStream>>> {
        self.inner.searcher.search(expression)
    }

    /// Marks the backing data file as superseded by compaction. New view
    /// snapshots exclude superseded segments.
    pub fn mark_superseded(&self) {
        self.inner.superseded.store(true, Ordering::Release);
    }

    /// Whether the backing data file has been compacted away.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.inner.superseded.load(Ordering::Acquire)
    }

    /// Number of live handles to this segment, the view's included.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("data_file", &self.inner.meta.data_file)
            .field("min_key", &self.inner.meta.min_key)
            .field("max_key", &self.inner.meta.max_key)
            .field("superseded", &self.is_superseded())
            .finish()
    }
}
