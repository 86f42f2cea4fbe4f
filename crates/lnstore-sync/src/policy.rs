//! Channel routing policy reconciliation

use lnstore_core::{Record, Store};

use crate::error::{SyncError, SyncResult};
use crate::outcome::SyncOutcome;
use crate::reconcile::reconcile;
use crate::schema::{hex_field, require, POLICY};
use crate::source::{LightningSource, PolicyInfo};

/// Mirror the policy `public_key` publishes for channel `channel_id`.
///
/// Authors that never published a policy update are skipped, as are
/// channels the source does not know.
pub fn sync_policy<S>(store: &Store, source: &S, public_key: &str, channel_id: &str) -> SyncResult<SyncOutcome>
where
    S: LightningSource + ?Sized,
{
    let key_bytes = hex_field(POLICY.kind, "public key", public_key)?;
    require(POLICY.kind, "channel id", channel_id)?;
    let key = POLICY.key(&[public_key, channel_id])?;

    let stored = store.get(POLICY.table, &key)?;
    let policy = source
        .channel(channel_id)
        .map_err(SyncError::fetch(POLICY.kind))?
        .and_then(|channel| channel.policies.into_iter().find(|p| p.public_key == public_key));

    let fresh = policy
        .filter(|p| p.updated_at.is_some())
        .filter(|p| stored.is_some() || p.is_disabled.is_some())
        .map(|p| policy_record(&p, channel_id, key_bytes));

    reconcile(store, &POLICY, &key, stored, fresh)
}

fn policy_record(policy: &PolicyInfo, channel_id: &str, public_key: Vec<u8>) -> Record {
    Record::new()
        .with_opt("base_fee_mtokens", policy.base_fee_mtokens.clone())
        .with_opt("cltv_delta", policy.cltv_delta)
        .with_opt("fee_rate", policy.fee_rate)
        .with("id", channel_id)
        .with_opt("is_disabled", policy.is_disabled)
        .with_opt("max_htlc_mtokens", policy.max_htlc_mtokens.clone())
        .with_opt("min_htlc_mtokens", policy.min_htlc_mtokens.clone())
        .with("public_key", public_key)
        .with_opt("updated_at", policy.updated_at.clone())
}
