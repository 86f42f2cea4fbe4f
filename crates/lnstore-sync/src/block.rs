//! Block records
//!
//! Blocks are written once. Seeing a known block again is a no-op.

use lnstore_core::{Record, Store};

use crate::error::SyncResult;
use crate::outcome::SyncOutcome;
use crate::reconcile::reconcile;
use crate::schema::{hex_field, BLOCK};

/// Record the block with hash `id` at `height`.
pub fn sync_block(store: &Store, id: &str, height: u32) -> SyncResult<SyncOutcome> {
    let hash = hex_field(BLOCK.kind, "block id", id)?;
    let key = BLOCK.key(&[id])?;

    let stored = store.get(BLOCK.table, &key)?;
    let fresh = Record::new().with("height", height).with("id", hash);

    reconcile(store, &BLOCK, &key, stored, Some(fresh))
}
