use crate::error::Result;
use crate::key::RowKey;

/// Pull-based stream of row keys in ascending order, de-duplicated within
/// one stream.
///
/// Streams wrap open index resources (an on-disk segment cursor, a memtable
/// snapshot); `close` releases those resources. Consumers performing
/// best-effort release swallow close errors so that teardown of one stream
/// never masks the query outcome or blocks teardown of the rest.
pub trait KeyStream: Send {
    /// Returns the next key, or `None` once exhausted.
    fn next_key(&mut self) -> Option<RowKey>;

    /// Releases backing resources. In-memory streams have nothing to close.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory stream over an owned, sorted set of keys.
///
/// Used by memtable search implementations and tests; sorting and
/// de-duplication happen at construction.
pub struct VecStream {
    keys: std::vec::IntoIter<RowKey>,
}

impl VecStream {
    /// Builds a stream from keys in any order.
    #[must_use]
    pub fn new(mut keys: Vec<RowKey>) -> Self {
        keys.sort();
        keys.dedup();
        Self {
            keys: keys.into_iter(),
        }
    }

    /// Stream yielding no keys.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl KeyStream for VecStream {
    fn next_key(&mut self) -> Option<RowKey> {
        self.keys.next()
    }
}

/// Drains a stream into a vector. Test helper.
pub fn collect(stream: &mut dyn KeyStream) -> Vec<RowKey> {
    let mut keys = Vec::new();
    while let Some(key) = stream.next_key() {
        keys.push(key);
    }
    keys
}
