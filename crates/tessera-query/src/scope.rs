use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use tessera_core::{DataFileId, KeyRange, Result};

use crate::store::EntityStore;

/// Set of data files pinned against concurrent removal for one query.
///
/// Computed once from the query's key range at controller construction and
/// released exactly once at query end: explicitly through
/// [`FileScope::release`], or on drop for any exit path that skipped it.
pub struct FileScope {
    files: HashSet<DataFileId>,
    store: Arc<dyn EntityStore>,
    released: bool,
}

impl FileScope {
    /// Pins the data files overlapping `range`. An empty or unresolvable
    /// range pins nothing; a query that touches no files is valid and
    /// simply yields no results.
    pub(crate) fn pin(store: Arc<dyn EntityStore>, range: &KeyRange) -> Result<Self> {
        let files = store.pin_scope(range)?;
        debug!(files = files.len(), "pinned query scope");
        Ok(Self {
            files,
            store,
            released: false,
        })
    }

    /// Whether `file` is inside the pinned scope.
    #[must_use]
    pub fn contains(&self, file: &DataFileId) -> bool {
        self.files.contains(file)
    }

    /// The pinned file set.
    #[must_use]
    pub fn files(&self) -> &HashSet<DataFileId> {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Releases the pinned references.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.store.release_scope(&self.files);
        }
    }
}

impl Drop for FileScope {
    fn drop(&mut self) {
        self.release_once();
    }
}
