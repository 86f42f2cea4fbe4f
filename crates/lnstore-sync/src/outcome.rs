//! Result of one reconciliation

use lnstore_core::Record;

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// First observation; the record as stored (without `_rev`)
    Created(Record),
    /// Re-observation that differed from the stored record
    Updated {
        /// Stored values of the attributes that changed
        previous: Record,
        /// New values of the attributes that changed
        updates: Record,
        /// Whole stored record before the update
        original: Record,
    },
    /// Nothing stored and nothing observed, or nothing changed
    Unchanged,
}

impl SyncOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, SyncOutcome::Created(_))
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, SyncOutcome::Updated { .. })
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, SyncOutcome::Unchanged)
    }

    pub fn created(&self) -> Option<&Record> {
        match self {
            SyncOutcome::Created(record) => Some(record),
            _ => None,
        }
    }

    /// `(previous, updates)` for an update.
    pub fn changes(&self) -> Option<(&Record, &Record)> {
        match self {
            SyncOutcome::Updated { previous, updates, .. } => Some((previous, updates)),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Created(_) => "created",
            SyncOutcome::Updated { .. } => "updated",
            SyncOutcome::Unchanged => "unchanged",
        }
    }
}
