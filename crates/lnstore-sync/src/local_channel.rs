//! Local channel reconciliation

use lnstore_core::{Record, Store};

use crate::error::{SyncError, SyncResult};
use crate::outcome::SyncOutcome;
use crate::reconcile::reconcile;
use crate::schema::{hex_field, LOCAL_CHANNEL};
use crate::source::{LightningSource, LocalChannelInfo};

/// Mirror the local channel funded by `transaction_id:transaction_vout`,
/// as seen by the node with `public_key`.
pub fn sync_local_channel<S>(
    store: &Store,
    source: &S,
    public_key: &str,
    transaction_id: &str,
    transaction_vout: u32,
) -> SyncResult<SyncOutcome>
where
    S: LightningSource + ?Sized,
{
    let local = hex_field(LOCAL_CHANNEL.kind, "public key", public_key)?;
    let txid = hex_field(LOCAL_CHANNEL.kind, "transaction id", transaction_id)?;
    let vout = transaction_vout.to_string();
    let key = LOCAL_CHANNEL.key(&[public_key, transaction_id, vout.as_str()])?;

    let stored = store.get(LOCAL_CHANNEL.table, &key)?;
    let fresh = match source
        .local_channels()
        .map_err(SyncError::fetch(LOCAL_CHANNEL.kind))?
        .into_iter()
        .find(|c| c.transaction_id == transaction_id && c.transaction_vout == transaction_vout)
    {
        Some(channel) => Some(local_channel_record(&channel, local, txid)?),
        None => None,
    };

    reconcile(store, &LOCAL_CHANNEL, &key, stored, fresh)
}

fn local_channel_record(channel: &LocalChannelInfo, local: Vec<u8>, txid: Vec<u8>) -> SyncResult<Record> {
    let partner = hex_field(LOCAL_CHANNEL.kind, "partner public key", &channel.partner_public_key)?;

    Ok(Record::new()
        .with("capacity", channel.capacity)
        .with("commit_transaction_fee", channel.commit_transaction_fee)
        .with("commit_transaction_weight", channel.commit_transaction_weight)
        .with_opt("cooperative_close_address", channel.cooperative_close_address.clone())
        .with("id", channel.id.as_str())
        .with("is_active", channel.is_active)
        .with("is_partner_initiated", channel.is_partner_initiated)
        .with("is_private", channel.is_private)
        .with_opt("is_static_remote_key", channel.is_static_remote_key)
        .with("local_balance", channel.local_balance)
        .with_opt("local_given", channel.local_given)
        .with("local_public_key", local)
        .with("local_reserve", channel.local_reserve)
        .with("partner_public_key", partner)
        .with("received", channel.received)
        .with("remote_balance", channel.remote_balance)
        .with_opt("remote_given", channel.remote_given)
        .with("remote_reserve", channel.remote_reserve)
        .with("sent", channel.sent)
        .with("transaction_id", txid)
        .with("transaction_vout", channel.transaction_vout)
        .with("unsettled_balance", channel.unsettled_balance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnstore_core::Value;

    #[test]
    fn test_record_keys_as_bytes() {
        let channel = LocalChannelInfo {
            id: "700000x1x0".into(),
            capacity: 1_000_000,
            partner_public_key: "03bb".into(),
            local_balance: 400_000,
            ..Default::default()
        };

        let record = local_channel_record(&channel, vec![2], vec![0xab]).unwrap();
        assert_eq!(record.get("partner_public_key"), Some(&Value::Bytes(vec![0x03, 0xbb])));
        assert_eq!(record.get("local_public_key"), Some(&Value::Bytes(vec![2])));
        assert_eq!(record.get("transaction_id"), Some(&Value::Bytes(vec![0xab])));
        assert_eq!(record.get("local_balance"), Some(&Value::Int(400_000)));
        assert!(!record.contains("local_given"));
    }

    #[test]
    fn test_bad_partner_key() {
        let channel = LocalChannelInfo { partner_public_key: "xyz".into(), ..Default::default() };
        assert_eq!(local_channel_record(&channel, vec![2], vec![1]).unwrap_err().status(), 400);
    }
}
