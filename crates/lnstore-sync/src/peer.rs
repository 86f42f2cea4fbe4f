//! Peer connection reconciliation
//!
//! Peers are keyed by the local and remote public keys together, so the same
//! remote seen from two local nodes stays two records. A stored peer that no
//! longer shows up in the connection list is kept and flipped to
//! disconnected.

use lnstore_core::{Record, Store, Value};

use crate::error::{SyncError, SyncResult};
use crate::outcome::SyncOutcome;
use crate::reconcile::reconcile;
use crate::schema::{hex_field, PEER};
use crate::source::{LightningSource, PeerInfo};

/// Mirror the connection state of the peer with `public_key`.
pub fn sync_peer<S>(store: &Store, source: &S, public_key: &str) -> SyncResult<SyncOutcome>
where
    S: LightningSource + ?Sized,
{
    let remote = hex_field(PEER.kind, "public key", public_key)?;

    let local_key = source.identity().map_err(SyncError::fetch(PEER.kind))?;
    let local = hex_field(PEER.kind, "local public key", &local_key)?;
    let key = PEER.key(&[local_key.as_str(), public_key])?;

    let stored = store.get(PEER.table, &key)?;
    let connected = source
        .peers()
        .map_err(SyncError::fetch(PEER.kind))?
        .into_iter()
        .find(|peer| peer.public_key == public_key);

    let fresh = match (connected, &stored) {
        (Some(peer), _) => Some(peer_record(&peer, local, remote, stored.as_ref())),
        (None, Some(stored)) if stored.get("is_connected") == Some(&Value::Bool(true)) => {
            Some(stored.clone().with("is_connected", false))
        }
        (None, _) => None,
    };

    reconcile(store, &PEER, &key, stored, fresh)
}

fn peer_record(peer: &PeerInfo, local: Vec<u8>, remote: Vec<u8>, stored: Option<&Record>) -> Record {
    let mut record = Record::new()
        .with("from", local)
        .with("is_connected", true)
        .with("is_inbound", peer.is_inbound)
        .with_opt("is_sync_peer", peer.is_sync_peer)
        .with("public_key", remote)
        .with("socket", peer.socket.as_str());

    match stored.and_then(|r| r.get("features")) {
        Some(features) if peer.features.is_empty() => record.set("features", features.clone()),
        _ => record.set("features", peer.features.clone()),
    }

    record
}
