use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Row key within the base data store.
///
/// Keys order lexicographically by raw bytes, matching the order produced by
/// the storage engine's key comparator.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(Bytes);

impl RowKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowKey({})", DisplayBytes(&self.0))
    }
}

impl From<&str> for RowKey {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Vec<u8>> for RowKey {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

/// Indexed term value for one column.
///
/// Terms carry the column's serialized representation; ordering is the raw
/// byte order, which the storage engine guarantees matches the column
/// comparator for indexable types.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Term(Bytes);

impl Term {
    /// Wraps raw term bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw term bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Upper bound of the term interval covered by a textual prefix: the
    /// prefix followed by the maximal byte, so that every term starting with
    /// the prefix sorts inside `[prefix, prefix_upper_bound]`.
    #[must_use]
    pub fn prefix_upper_bound(&self) -> Term {
        let mut bytes = self.0.to_vec();
        bytes.push(u8::MAX);
        Term::new(bytes)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term({})", DisplayBytes(&self.0))
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Vec<u8>> for Term {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

/// Inclusive row-key range of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    min: RowKey,
    max: RowKey,
}

impl KeyRange {
    /// Creates an inclusive range. Bounds are normalized so that
    /// `min <= max`.
    #[must_use]
    pub fn new(min: RowKey, max: RowKey) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Range covering exactly one key.
    #[must_use]
    pub fn point(key: RowKey) -> Self {
        Self {
            min: key.clone(),
            max: key,
        }
    }

    /// Lower inclusive bound.
    #[must_use]
    pub fn min(&self) -> &RowKey {
        &self.min
    }

    /// Upper inclusive bound.
    #[must_use]
    pub fn max(&self) -> &RowKey {
        &self.max
    }

    /// Whether `key` falls inside the range.
    #[must_use]
    pub fn contains(&self, key: &RowKey) -> bool {
        *key >= self.min && *key <= self.max
    }

    /// Whether the two inclusive ranges share at least one key.
    #[must_use]
    pub fn overlaps(&self, other: &KeyRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

struct DisplayBytes<'a>(&'a [u8]);

impl fmt::Display for DisplayBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(s) => write!(f, "{s:?}"),
            Err(_) => write!(f, "0x{}", hex(self.0)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
