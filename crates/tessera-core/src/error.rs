use std::time::Duration;

use thiserror::Error;

/// Canonical error type for the tessera crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The same predicate collection was planned twice within one query
    /// session. Indicates a resource-tracking bug in the caller.
    #[error("predicate group has already been planned in this query session")]
    GroupAlreadyPlanned,

    /// The query ran past its wall-clock execution quota.
    #[error("execution quota of {quota:?} exceeded ({elapsed:?} elapsed)")]
    QuotaExceeded {
        /// Configured execution quota for the session.
        quota: Duration,
        /// Wall-clock time elapsed when the quota check fired.
        elapsed: Duration,
    },

    /// A view snapshot was built from an inconsistent segment set.
    #[error("mismatched interval counts for keys vs terms: {key_intervals} != {term_intervals}")]
    InconsistentView {
        /// Interval count reported by the key-interval structure.
        key_intervals: usize,
        /// Interval count reported by the term structure.
        term_intervals: usize,
    },

    /// I/O error occurred while reading an index segment.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a `Storage` variant.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is the distinguished quota-exceeded condition,
    /// which callers typically surface as a timeout rather than a fault.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Convenient result alias bound to the shared error type.
pub type Result<T> = std::result::Result<T, Error>;
