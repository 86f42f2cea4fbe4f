//! Public channel reconciliation and closing
//!
//! Funding details (capacity, txid, vout) are filled in once: a channel first
//! seen without a funding transaction gets them on a later observation, after
//! which they are never rewritten.

use lnstore_core::{Changes, Record, Store, Value};

use crate::error::{SyncError, SyncResult};
use crate::outcome::SyncOutcome;
use crate::reconcile::{expect_rev, reconcile};
use crate::schema::{hex_field, require, CHANNEL};
use crate::source::{ChannelInfo, LightningSource};

const FUNDING: [&str; 3] = ["capacity", "transaction_id", "transaction_vout"];

/// Mirror the public details of channel `id`.
pub fn sync_channel<S>(store: &Store, source: &S, id: &str) -> SyncResult<SyncOutcome>
where
    S: LightningSource + ?Sized,
{
    require(CHANNEL.kind, "channel id", id)?;
    let key = CHANNEL.key(&[id])?;

    let stored = store.get(CHANNEL.table, &key)?;
    let fresh = match source.channel(id).map_err(SyncError::fetch(CHANNEL.kind))? {
        Some(channel) => Some(channel_record(id, &channel, stored.as_ref())?),
        None => None,
    };

    reconcile(store, &CHANNEL, &key, stored, fresh)
}

fn channel_record(id: &str, channel: &ChannelInfo, stored: Option<&Record>) -> SyncResult<Record> {
    let public_keys = channel
        .policies
        .iter()
        .map(|policy| hex_field(CHANNEL.kind, "policy public key", &policy.public_key))
        .collect::<SyncResult<Vec<_>>>()?;

    let mut record = Record::new().with("id", id).with("public_keys", Value::bytes_list(public_keys));

    if let Some(stored) = stored.filter(|r| r.contains("capacity")) {
        for attr in FUNDING {
            record.set_opt(attr, stored.get(attr).cloned());
        }
        return Ok(record);
    }

    if has_funding_tx(&channel.transaction_id) {
        record.set("capacity", channel.capacity);
        record.set("transaction_id", hex_field(CHANNEL.kind, "transaction id", &channel.transaction_id)?);
        record.set("transaction_vout", channel.transaction_vout);
    }

    Ok(record)
}

/// Unannounced channels report an empty or all-zero funding txid.
fn has_funding_tx(transaction_id: &str) -> bool {
    !transaction_id.is_empty() && transaction_id.bytes().any(|b| b != b'0')
}

/// Result of [`mark_channel_closed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedChannel {
    /// The channel already carried a close height
    pub was_closed: bool,
    /// Endpoint public keys recorded for the channel
    pub public_keys: Vec<Vec<u8>>,
}

/// Record that channel `id` closed at `close_height`.
///
/// Returns `None` when the channel was never stored. A channel that is
/// already closed keeps its original close height.
pub fn mark_channel_closed(store: &Store, id: &str, close_height: u32) -> SyncResult<Option<ClosedChannel>> {
    require(CHANNEL.kind, "channel id", id)?;
    if close_height == 0 {
        return Err(SyncError::validation(CHANNEL.kind, "expected close height"));
    }
    let key = CHANNEL.key(&[id])?;

    let Some(stored) = store.get(CHANNEL.table, &key)? else {
        return Ok(None);
    };

    let public_keys: Vec<Vec<u8>> = stored
        .get("public_keys")
        .and_then(Value::as_list)
        .map(|keys| keys.iter().filter_map(Value::as_bytes).map(<[u8]>::to_vec).collect())
        .unwrap_or_default();

    if stored.contains("close_height") {
        return Ok(Some(ClosedChannel { was_closed: true, public_keys }));
    }

    let changes = Changes::new().bump_rev().set("close_height", close_height);
    store.update(CHANNEL.table, &key, &changes, Some(&expect_rev(CHANNEL.table, &stored)?))?;

    Ok(Some(ClosedChannel { was_closed: false, public_keys }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PolicyInfo;

    fn info(transaction_id: &str) -> ChannelInfo {
        ChannelInfo {
            id: "700000x1x0".into(),
            capacity: 250_000,
            transaction_id: transaction_id.into(),
            transaction_vout: 1,
            policies: vec![
                PolicyInfo { public_key: "02aa".into(), ..Default::default() },
                PolicyInfo { public_key: "03bb".into(), ..Default::default() },
            ],
        }
    }

    #[test]
    fn test_record_with_funding() {
        let record = channel_record("700000x1x0", &info("ab".repeat(32).as_str()), None).unwrap();
        assert_eq!(record.get("capacity"), Some(&Value::Int(250_000)));
        assert_eq!(record.get("transaction_vout"), Some(&Value::Int(1)));
        assert_eq!(
            record.get("public_keys"),
            Some(&Value::bytes_list(vec![vec![0x02u8, 0xaa], vec![0x03, 0xbb]]))
        );
    }

    #[test]
    fn test_record_without_funding() {
        let zeros = "0".repeat(64);
        for txid in ["", zeros.as_str()] {
            let record = channel_record("700000x1x0", &info(txid), None).unwrap();
            assert!(!record.contains("capacity"));
            assert!(!record.contains("transaction_id"));
            assert!(record.contains("public_keys"));
        }
    }

    #[test]
    fn test_funding_written_once() {
        let stored = Record::new()
            .with("capacity", 100i64)
            .with("transaction_id", vec![1u8; 32])
            .with("transaction_vout", 0u32);

        let record = channel_record("700000x1x0", &info("ab".repeat(32).as_str()), Some(&stored)).unwrap();
        assert_eq!(record.get("capacity"), Some(&Value::Int(100)));
        assert_eq!(record.get("transaction_id"), Some(&Value::Bytes(vec![1u8; 32])));
    }

    #[test]
    fn test_zero_close_height_is_validation() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::open(dir.path(), lnstore_core::StoreConfig::minimal()).unwrap();

        let err = mark_channel_closed(&store, "700000x1x0", 0).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(mark_channel_closed(&store, "700000x1x0", 800_000).unwrap().is_none());
    }

    #[test]
    fn test_bad_policy_key_is_validation() {
        let mut channel = info("");
        channel.policies[0].public_key = "not hex".into();
        let err = channel_record("700000x1x0", &channel, None).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
