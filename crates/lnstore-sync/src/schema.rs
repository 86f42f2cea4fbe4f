//! Per-kind record schemas
//!
//! Each entity kind lives in its own table and declares which attributes are
//! diffable. Everything else on the record (identity, create-only details,
//! attributes owned by other operations such as `close_height`) is left
//! alone by reconciliation.

use lnstore_core::Key;

use crate::error::{SyncError, SyncResult};

/// Revision every record is created at.
pub const BASE_REV: i64 = 0;

/// Declarative description of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Type tag hashed into the key
    pub kind: &'static str,
    pub table: &'static str,
    /// Natural unique attribute, guarded with a fresh constraint on create
    pub unique: &'static str,
    /// Attributes compared and updated on re-observation; empty for
    /// create-only kinds
    pub mutable: &'static [&'static str],
}

impl Schema {
    /// Create-only kinds never update.
    pub fn is_immutable(&self) -> bool {
        self.mutable.is_empty()
    }

    /// Key for the identity made of `parts`.
    pub fn key(&self, parts: &[&str]) -> SyncResult<Key> {
        Ok(Key::derive_composite(self.kind, parts)?)
    }
}

pub const NODE: Schema = Schema {
    kind: "node",
    table: "nodes",
    unique: "public_key",
    mutable: &["alias", "color", "features", "sockets", "updated_at"],
};

pub const CHANNEL: Schema = Schema {
    kind: "channel",
    table: "channels",
    unique: "id",
    mutable: &["capacity", "transaction_id", "transaction_vout"],
};

pub const POLICY: Schema = Schema {
    kind: "policy",
    table: "policies",
    unique: "id",
    mutable: &[
        "base_fee_mtokens",
        "cltv_delta",
        "fee_rate",
        "is_disabled",
        "max_htlc_mtokens",
        "min_htlc_mtokens",
        "updated_at",
    ],
};

pub const PEER: Schema = Schema {
    kind: "peer",
    table: "peers",
    unique: "public_key",
    mutable: &["features", "is_connected", "is_inbound", "is_sync_peer", "socket"],
};

pub const LOCAL_CHANNEL: Schema = Schema {
    kind: "local_channel",
    table: "local_channels",
    unique: "id",
    mutable: &[
        "commit_transaction_fee",
        "commit_transaction_weight",
        "is_active",
        "local_balance",
        "received",
        "remote_balance",
        "sent",
        "unsettled_balance",
    ],
};

pub const BLOCK: Schema = Schema {
    kind: "block",
    table: "blocks",
    unique: "id",
    mutable: &[],
};

pub const FORWARD_HTLC: Schema = Schema {
    kind: "forward_htlc",
    table: "forward_htlcs",
    unique: "out_payment",
    mutable: &[
        "cltv_delta",
        "external_failure",
        "fee_mtokens",
        "internal_failure",
        "is_confirmed",
        "is_failed",
        "mtokens",
        "timeout",
        "updated_at",
    ],
};

pub const PAYMENT_HTLC: Schema = Schema {
    kind: "payment_htlc",
    table: "payment_htlcs",
    unique: "out_payment",
    mutable: &["is_confirmed", "is_failed", "mtokens", "timeout", "updated_at"],
};

pub const RECEIVE_HTLC: Schema = Schema {
    kind: "receive_htlc",
    table: "receive_htlcs",
    unique: "in_payment",
    mutable: &["is_confirmed", "is_failed", "updated_at"],
};

/// Every schema, for callers that walk all tables.
pub const ALL: [&Schema; 9] = [
    &NODE,
    &CHANNEL,
    &POLICY,
    &PEER,
    &LOCAL_CHANNEL,
    &BLOCK,
    &FORWARD_HTLC,
    &PAYMENT_HTLC,
    &RECEIVE_HTLC,
];

// ---------------------------------------------------------------------------
// Input checks
// ---------------------------------------------------------------------------

/// Non-empty string input.
pub(crate) fn require<'a>(entity: &'static str, field: &str, value: &'a str) -> SyncResult<&'a str> {
    if value.trim().is_empty() {
        return Err(SyncError::validation(entity, format!("expected {}", field)));
    }
    Ok(value)
}

/// Non-empty hex input, decoded.
pub(crate) fn hex_field(entity: &'static str, field: &str, value: &str) -> SyncResult<Vec<u8>> {
    require(entity, field, value)?;
    hex::decode(value).map_err(|e| SyncError::validation(entity, format!("{} is not hex: {}", field, e)))
}

/// Unsigned index that must fit a stored integer.
pub(crate) fn index_field(entity: &'static str, field: &str, value: u64) -> SyncResult<i64> {
    i64::try_from(value).map_err(|_| SyncError::validation(entity, format!("{} {} is out of range", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_and_tags_unique() {
        let tables: HashSet<_> = ALL.iter().map(|s| s.table).collect();
        let kinds: HashSet<_> = ALL.iter().map(|s| s.kind).collect();
        assert_eq!(tables.len(), ALL.len());
        assert_eq!(kinds.len(), ALL.len());
    }

    #[test]
    fn test_unique_attribute_never_diffable() {
        for schema in ALL {
            assert!(!schema.mutable.contains(&schema.unique), "{}", schema.kind);
        }
    }

    #[test]
    fn test_only_blocks_are_immutable() {
        let immutable: Vec<_> = ALL.iter().filter(|s| s.is_immutable()).map(|s| s.kind).collect();
        assert_eq!(immutable, vec!["block"]);
    }

    #[test]
    fn test_key_uses_kind_tag() {
        let a = NODE.key(&["02aa"]).unwrap();
        let b = PEER.key(&["02aa"]).unwrap();
        assert_ne!(a, b);
        assert_eq!(NODE.key(&[""]).unwrap_err().status(), 400);
    }

    #[test]
    fn test_input_checks() {
        assert!(require("node", "public key", " ").is_err());
        assert_eq!(hex_field("node", "public key", "02ab").unwrap(), vec![0x02, 0xab]);
        assert!(hex_field("node", "public key", "zz").is_err());
        assert_eq!(index_field("htlc", "in_payment", 7).unwrap(), 7);
        assert!(index_field("htlc", "in_payment", u64::MAX).is_err());
    }
}
