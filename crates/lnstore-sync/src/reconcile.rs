//! Create-or-update decision shared by every entity kind
//!
//! Kind modules load the stored record, build the fresh record from the
//! observation, and hand both here. Creates are guarded with a fresh
//! constraint on the kind's unique attribute; updates are guarded with the
//! stored `_rev`.

use lnstore_core::{ConflictReason, Key, Record, Store, StoreError, REV};
use tracing::debug;

use crate::diff::diff;
use crate::error::SyncResult;
use crate::outcome::SyncOutcome;
use crate::schema::{Schema, BASE_REV};

pub(crate) fn reconcile(
    store: &Store,
    schema: &Schema,
    key: &Key,
    stored: Option<Record>,
    fresh: Option<Record>,
) -> SyncResult<SyncOutcome> {
    let outcome = match (stored, fresh) {
        (None, Some(fresh)) => create(store, schema, key, fresh)?,
        (Some(stored), Some(fresh)) if !schema.is_immutable() => update(store, schema, key, stored, &fresh)?,
        _ => SyncOutcome::Unchanged,
    };

    debug!(kind = schema.kind, key = %key, outcome = outcome.label(), "reconciled");
    Ok(outcome)
}

fn create(store: &Store, schema: &Schema, key: &Key, fresh: Record) -> SyncResult<SyncOutcome> {
    let record = fresh.with(REV, BASE_REV);
    match store.put(schema.table, key, &record, Some(&[schema.unique])) {
        Ok(()) => Ok(SyncOutcome::Created(record.without(REV))),
        // Another writer created it first; an immutable record has nothing left to do
        Err(StoreError::Conflict { reason: ConflictReason::FreshViolation { .. }, .. }) if schema.is_immutable() => {
            Ok(SyncOutcome::Unchanged)
        }
        Err(err) => Err(err.into()),
    }
}

fn update(store: &Store, schema: &Schema, key: &Key, stored: Record, fresh: &Record) -> SyncResult<SyncOutcome> {
    let Some(set) = diff(&stored.project(schema.mutable), &fresh.project(schema.mutable)) else {
        return Ok(SyncOutcome::Unchanged);
    };

    store.update(schema.table, key, &set.changes, Some(&expect_rev(schema.table, &stored)?))?;

    Ok(SyncOutcome::Updated { previous: set.previous, updates: set.updated, original: stored })
}

/// Expectation pinning the stored revision.
pub(crate) fn expect_rev(table: &str, stored: &Record) -> SyncResult<Record> {
    match stored.rev() {
        Some(rev) => Ok(Record::new().with(REV, rev)),
        None => Err(StoreError::Corrupted {
            table: table.to_owned(),
            message: "stored record has no revision".into(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BLOCK, NODE};
    use lnstore_core::{StoreConfig, Value};
    use tempfile::TempDir;

    fn test_store() -> (Store, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), StoreConfig::minimal()).unwrap();
        (store, dir)
    }

    fn node(alias: &str) -> Record {
        Record::new()
            .with("alias", alias)
            .with("color", "#fff")
            .with("features", Value::List(vec![]))
            .with("sockets", Value::List(vec![]))
    }

    #[test]
    fn test_create_then_noop() {
        let (store, _dir) = test_store();
        let key = NODE.key(&["02aa"]).unwrap();

        let outcome = reconcile(&store, &NODE, &key, None, Some(node("A"))).unwrap();
        assert_eq!(outcome, SyncOutcome::Created(node("A")));
        assert_eq!(store.get(NODE.table, &key).unwrap().unwrap().rev(), Some(0));

        let stored = store.get(NODE.table, &key).unwrap();
        let outcome = reconcile(&store, &NODE, &key, stored, Some(node("A"))).unwrap();
        assert!(outcome.is_unchanged());
    }

    #[test]
    fn test_update_bumps_rev() {
        let (store, _dir) = test_store();
        let key = NODE.key(&["02aa"]).unwrap();
        store.put(NODE.table, &key, &Record::new().with("alias", "A").with(REV, 0i64), None).unwrap();

        let stored = store.get(NODE.table, &key).unwrap();
        let outcome = reconcile(&store, &NODE, &key, stored, Some(Record::new().with("alias", "B"))).unwrap();

        let (previous, updates) = outcome.changes().unwrap();
        assert_eq!(previous, &Record::new().with("alias", "A"));
        assert_eq!(updates, &Record::new().with("alias", "B"));
        assert_eq!(store.get(NODE.table, &key).unwrap().unwrap().rev(), Some(1));
    }

    #[test]
    fn test_identity_attributes_not_diffed() {
        let (store, _dir) = test_store();
        let key = NODE.key(&["02aa"]).unwrap();
        let stored = node("A").with("public_key", vec![2u8]).with(REV, 0i64);
        store.put(NODE.table, &key, &stored, None).unwrap();

        let fresh = node("A").with("public_key", vec![3u8]);
        let outcome = reconcile(&store, &NODE, &key, Some(stored), Some(fresh)).unwrap();
        assert!(outcome.is_unchanged());
    }

    #[test]
    fn test_stale_stored_record_conflicts() {
        let (store, _dir) = test_store();
        let key = NODE.key(&["02aa"]).unwrap();
        let stale = Record::new().with("alias", "A").with(REV, 0i64);
        store.put(NODE.table, &key, &stale.clone().with(REV, 1i64), None).unwrap();

        let err = reconcile(&store, &NODE, &key, Some(stale), Some(Record::new().with("alias", "B"))).unwrap_err();
        assert_eq!(err.status(), 409);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_concurrent_create_conflicts() {
        let (store, _dir) = test_store();
        let key = NODE.key(&["02aa"]).unwrap();
        store.put(NODE.table, &key, &node("other").with("public_key", vec![2u8]), None).unwrap();

        // Loaded before the other writer created it
        let err = reconcile(&store, &NODE, &key, None, Some(node("A").with("public_key", vec![2u8]))).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_immutable_lost_create_is_noop() {
        let (store, _dir) = test_store();
        let key = BLOCK.key(&["00ff"]).unwrap();
        let winner = Record::new().with("height", 1i64).with("id", vec![0x00u8, 0xff]).with(REV, 0i64);
        store.put(BLOCK.table, &key, &winner, None).unwrap();

        // Loaded before the other writer created it
        let fresh = Record::new().with("height", 1i64).with("id", vec![0x00u8, 0xff]);
        let outcome = reconcile(&store, &BLOCK, &key, None, Some(fresh)).unwrap();
        assert!(outcome.is_unchanged());
        assert_eq!(store.get(BLOCK.table, &key).unwrap(), Some(winner));
    }

    #[test]
    fn test_immutable_never_updates() {
        let (store, _dir) = test_store();
        let key = BLOCK.key(&["00ff"]).unwrap();
        let stored = Record::new().with("height", 1i64).with(REV, 0i64);

        let outcome = reconcile(&store, &BLOCK, &key, Some(stored), Some(Record::new().with("height", 2i64))).unwrap();
        assert!(outcome.is_unchanged());
    }

    #[test]
    fn test_nothing_fresh_is_noop() {
        let (store, _dir) = test_store();
        let key = NODE.key(&["02aa"]).unwrap();
        assert!(reconcile(&store, &NODE, &key, None, None).unwrap().is_unchanged());
        assert!(reconcile(&store, &NODE, &key, Some(node("A")), None).unwrap().is_unchanged());
    }

    #[test]
    fn test_missing_rev_is_corruption() {
        let err = expect_rev("nodes", &Record::new()).unwrap_err();
        assert_eq!(err.status(), 503);
    }
}
