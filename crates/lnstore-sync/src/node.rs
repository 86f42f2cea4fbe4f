//! Graph node reconciliation

use lnstore_core::{Record, Store, Value};

use crate::error::{SyncError, SyncResult};
use crate::outcome::SyncOutcome;
use crate::reconcile::reconcile;
use crate::schema::{hex_field, NODE};
use crate::source::{LightningSource, NodeInfo};

/// Mirror the announced details of the node with `public_key`.
pub fn sync_node<S>(store: &Store, source: &S, public_key: &str) -> SyncResult<SyncOutcome>
where
    S: LightningSource + ?Sized,
{
    let key_bytes = hex_field(NODE.kind, "public key", public_key)?;
    let key = NODE.key(&[public_key])?;

    let stored = store.get(NODE.table, &key)?;
    let fresh = source
        .node(public_key)
        .map_err(SyncError::fetch(NODE.kind))?
        .map(|node| node_record(&node, key_bytes, stored.as_ref()));

    reconcile(store, &NODE, &key, stored, fresh)
}

fn node_record(node: &NodeInfo, public_key: Vec<u8>, stored: Option<&Record>) -> Record {
    let mut record = Record::new()
        .with("alias", node.alias.as_str())
        .with("color", node.color.as_str())
        .with("public_key", public_key)
        .with("sockets", node.sockets.clone());

    // An empty feature list means the node has not re-announced them
    match stored.and_then(|r| r.get("features")) {
        Some(features) if node.features.is_empty() => record.set("features", features.clone()),
        _ => record.set("features", node.features.clone()),
    }

    let updated_at = node.updated_at.clone().map(Value::Text);
    record.set_opt("updated_at", updated_at.or_else(|| stored.and_then(|r| r.get("updated_at")).cloned()));

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> NodeInfo {
        NodeInfo {
            alias: "carol".into(),
            color: "#ff00ff".into(),
            features: vec![7, 9],
            sockets: vec!["1.2.3.4:9735".into()],
            updated_at: Some("2024-01-01T00:00:00.000Z".into()),
        }
    }

    #[test]
    fn test_record_from_fresh() {
        let record = node_record(&info(), vec![2, 3], None);
        assert_eq!(record.get("alias"), Some(&Value::from("carol")));
        assert_eq!(record.get("public_key"), Some(&Value::Bytes(vec![2, 3])));
        assert_eq!(record.get("features"), Some(&Value::from(vec![7u32, 9])));
    }

    #[test]
    fn test_empty_features_keep_stored() {
        let stored = Record::new().with("features", vec![1u32]).with("updated_at", "earlier");
        let fresh = NodeInfo { features: vec![], updated_at: None, ..info() };

        let record = node_record(&fresh, vec![2], Some(&stored));
        assert_eq!(record.get("features"), Some(&Value::from(vec![1u32])));
        assert_eq!(record.get("updated_at"), Some(&Value::from("earlier")));
    }

    #[test]
    fn test_no_stored_no_updated_at() {
        let fresh = NodeInfo { updated_at: None, ..info() };
        let record = node_record(&fresh, vec![2], None);
        assert!(!record.contains("updated_at"));
    }
}
