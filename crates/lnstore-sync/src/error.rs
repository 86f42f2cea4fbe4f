//! Error types for reconciliation
//!
//! Storage failures keep their own classification; source failures and an
//! exhausted retry budget are storage-class (503) because the caller can do
//! nothing about them except try again later.

use lnstore_core::{ErrorKind, StoreError};
use thiserror::Error;

use crate::source::SourceError;

/// Reconciliation error types
#[derive(Debug, Error)]
pub enum SyncError {
    /// Identifying input missing or malformed
    #[error("invalid {entity} input: {message}")]
    Validation {
        /// Entity kind being synced
        entity: &'static str,
        /// What was wrong
        message: String,
    },

    /// Storage layer failure, including write conflicts
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The node being mirrored could not answer
    #[error("{entity} lookup failed: {source}")]
    Source {
        /// Entity kind being fetched
        entity: &'static str,
        /// Error reported by the source
        #[source]
        source: SourceError,
    },

    /// Conflicts kept happening until the attempt budget ran out
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made, including the first
        attempts: u32,
        /// Error from the final attempt
        #[source]
        last: Box<SyncError>,
    },
}

impl SyncError {
    pub(crate) fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        SyncError::Validation { entity, message: message.into() }
    }

    pub(crate) fn fetch(entity: &'static str) -> impl FnOnce(SourceError) -> SyncError {
        move |source| SyncError::Source { entity, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Validation { .. } => ErrorKind::Validation,
            SyncError::Store(err) => err.kind(),
            SyncError::Source { .. } | SyncError::RetriesExhausted { .. } => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    /// Map was grown; retry immediately.
    pub fn is_capacity(&self) -> bool {
        matches!(self, SyncError::Store(err) if err.is_capacity())
    }

    /// Lost a race with another writer (or hit the map ceiling).
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Store(err) if err.is_retryable())
    }
}

/// Result type alias for reconciliation
pub type SyncResult<T> = Result<T, SyncError>;
