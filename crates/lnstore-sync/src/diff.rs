//! Change-set engine
//!
//! Compares a stored record with a fresh observation attribute by attribute.
//! Lists compare as sets and a missing list equals an empty one, so
//! re-observing the same state (in any order) never produces a write.

use std::collections::BTreeSet;

use lnstore_core::{Change, Changes, Record, Value};

/// Minimal update turning the stored record into the observed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// `_rev` increment plus one set or remove per differing attribute
    pub changes: Changes,
    /// Stored values of the differing attributes
    pub previous: Record,
    /// Fresh values of the differing attributes
    pub updated: Record,
}

/// Diff two flat records. `None` means there is nothing to write.
pub fn diff(stored: &Record, fresh: &Record) -> Option<ChangeSet> {
    let attrs: BTreeSet<&str> = stored.keys().chain(fresh.keys()).collect();

    let mut changes = Changes::new();
    let mut previous = Record::new();
    let mut updated = Record::new();

    for attr in attrs {
        let before = stored.get(attr);
        let after = fresh.get(attr);
        if same(before, after) {
            continue;
        }

        changes.insert(attr, after.map_or(Change::Remove, |v| Change::Set(v.clone())));
        previous.set_opt(attr, before.cloned());
        updated.set_opt(attr, after.cloned());
    }

    if changes.is_empty() {
        return None;
    }

    Some(ChangeSet { changes: changes.bump_rev(), previous, updated })
}

fn same(before: Option<&Value>, after: Option<&Value>) -> bool {
    match (before, after) {
        (Some(a), Some(b)) => a.set_eq(b),
        (None, None) => true,
        (Some(Value::List(items)), None) | (None, Some(Value::List(items))) => items.is_empty(),
        _ => false,
    }
}
