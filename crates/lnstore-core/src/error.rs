//! Error types for lnstore operations
//!
//! Every failure carries a discriminant ([`ErrorKind`]) so callers can decide
//! between surfacing the error, retrying, or treating it as a broken
//! environment. The kinds map onto HTTP-like status classes (400/409/503).

use std::path::PathBuf;

use thiserror::Error;

use crate::value::Record;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing caller input. Never retried.
    Validation,
    /// Lost an optimistic-concurrency race or hit the map ceiling.
    Conflict,
    /// Engine or data failure. Retrying does not help.
    Storage,
}

impl ErrorKind {
    /// Status class for this kind.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Storage => 503,
        }
    }
}

/// Why a write was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// A create found an existing record that already defines a fresh attribute
    FreshViolation {
        /// First fresh attribute found on the stored record
        attribute: String,
    },
    /// An update's expectation did not hold against the stored record
    ExpectMismatch {
        /// First attribute whose stored value differs from the expectation
        attribute: String,
    },
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::FreshViolation { attribute } => {
                write!(f, "fresh attribute `{}` already set", attribute)
            }
            ConflictReason::ExpectMismatch { attribute } => {
                write!(f, "expected value of `{}` does not match", attribute)
            }
        }
    }
}

/// lnstore error types with detailed context
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller supplied something unusable
    #[error("invalid input: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// Update targeted a key with no stored record
    #[error("no record to update in table `{table}`")]
    NotFound {
        /// Table that was searched
        table: String,
    },

    /// Write refused because the stored record disagrees with the caller
    #[error("write conflict in table `{table}`: {reason}")]
    Conflict {
        /// Table holding the record
        table: String,
        /// What disagreed
        reason: ConflictReason,
        /// Stored record at the time of the conflict
        stored: Box<Record>,
    },

    /// The write hit the map ceiling; capacity has been grown, retry the write
    #[error("map capacity exhausted during {operation}, grown to {map_size} bytes")]
    CapacityExhausted {
        /// Operation that failed
        operation: &'static str,
        /// Map size after growth
        map_size: usize,
    },

    /// Stored bytes could not be decoded into a record
    #[error("corrupted record in table `{table}`: {message}")]
    Corrupted {
        /// Table holding the record
        table: String,
        /// Decoder message
        message: String,
    },

    /// LMDB reported a failure
    #[error("storage engine failure during {operation}: {source}")]
    Engine {
        /// Operation that failed
        operation: &'static str,
        /// Underlying heed error
        #[source]
        source: heed::Error,
    },

    /// A transaction could not be finished after the operation ran
    #[error("failed to close transaction after {operation}: {source}")]
    Close {
        /// Operation whose transaction could not be closed
        operation: &'static str,
        /// Underlying heed error
        #[source]
        source: heed::Error,
    },

    /// Filesystem failure around the environment directory
    #[error("I/O error in {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation { .. } => ErrorKind::Validation,
            StoreError::NotFound { .. }
            | StoreError::Conflict { .. }
            | StoreError::CapacityExhausted { .. } => ErrorKind::Conflict,
            StoreError::Corrupted { .. }
            | StoreError::Engine { .. }
            | StoreError::Close { .. }
            | StoreError::Io { .. } => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    /// True when the map was grown and the same write should be retried at once.
    pub fn is_capacity(&self) -> bool {
        matches!(self, StoreError::CapacityExhausted { .. })
    }

    /// True for any failure a retry can resolve.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Stored record attached to a conflict, if any.
    pub fn stored(&self) -> Option<&Record> {
        match self {
            StoreError::Conflict { stored, .. } => Some(stored),
            _ => None,
        }
    }

    pub(crate) fn engine(operation: &'static str) -> impl FnOnce(heed::Error) -> StoreError {
        move |source| StoreError::Engine { operation, source }
    }

    /// LMDB signalled that the map is full or was resized underneath us.
    pub(crate) fn is_map_limit(&self) -> bool {
        match self {
            StoreError::Engine { source, .. } => is_map_limit(source),
            _ => false,
        }
    }
}

pub(crate) fn is_map_limit(err: &heed::Error) -> bool {
    matches!(
        err,
        heed::Error::Mdb(heed::MdbError::MapFull) | heed::Error::Mdb(heed::MdbError::MapResized)
    )
}

/// Result type alias for lnstore operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_status_classes() {
        assert_eq!(StoreError::validation("bad").status(), 400);
        assert_eq!(StoreError::NotFound { table: "nodes".into() }.status(), 409);
        let err = StoreError::CapacityExhausted { operation: "put", map_size: 1 << 20 };
        assert_eq!(err.status(), 409);
        assert!(err.is_capacity());
        let err = StoreError::Corrupted { table: "nodes".into(), message: "eof".into() };
        assert_eq!(err.status(), 503);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_display_and_stored() {
        let stored = Record::new().with("_rev", Value::Int(3));
        let err = StoreError::Conflict {
            table: "channels".into(),
            reason: ConflictReason::ExpectMismatch { attribute: "_rev".into() },
            stored: Box::new(stored.clone()),
        };

        let display = format!("{}", err);
        assert!(display.contains("channels"));
        assert!(display.contains("`_rev`"));
        assert_eq!(err.stored(), Some(&stored));
        assert!(err.is_retryable());
        assert!(!err.is_capacity());
    }

    #[test]
    fn test_map_full_detection() {
        let err = StoreError::Engine {
            operation: "put",
            source: heed::Error::Mdb(heed::MdbError::MapFull),
        };
        assert!(err.is_map_limit());
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err = StoreError::Engine {
            operation: "put",
            source: heed::Error::Mdb(heed::MdbError::Corrupted),
        };
        assert!(!err.is_map_limit());
    }
}
