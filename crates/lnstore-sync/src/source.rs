//! The Lightning node being mirrored
//!
//! [`LightningSource`] is the boundary to whatever produces fresh
//! observations (an RPC client, a test double). Single-entity lookups return
//! `Ok(None)` when the node does not know the entity; that is a normal "nothing
//! to reconcile yet" outcome, distinct from an `Err`.

use thiserror::Error;

/// Failure reported by a [`LightningSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Announced details of a graph node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
    pub alias: String,
    pub color: String,
    /// Feature bit numbers; empty when the node has not announced any
    pub features: Vec<u32>,
    pub sockets: Vec<String>,
    /// ISO 8601 time of the last announcement
    pub updated_at: Option<String>,
}

/// One direction of a channel's routing policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyInfo {
    /// Hex public key of the policy author
    pub public_key: String,
    pub base_fee_mtokens: Option<String>,
    pub cltv_delta: Option<u32>,
    /// Fee in millitokens per million
    pub fee_rate: Option<i64>,
    pub is_disabled: Option<bool>,
    pub max_htlc_mtokens: Option<String>,
    pub min_htlc_mtokens: Option<String>,
    /// ISO 8601 time of the last policy update; absent if never published
    pub updated_at: Option<String>,
}

/// Public channel as seen in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Standard format channel id, e.g. `700000x1x0`
    pub id: String,
    pub capacity: i64,
    /// Funding transaction id in hex; empty or all zeros when unknown
    pub transaction_id: String,
    pub transaction_vout: u32,
    /// One entry per endpoint
    pub policies: Vec<PolicyInfo>,
}

/// Currently connected peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerInfo {
    /// Hex public key of the remote node
    pub public_key: String,
    pub features: Vec<u32>,
    pub is_inbound: bool,
    pub is_sync_peer: Option<bool>,
    pub socket: String,
}

/// Channel the local node is a party to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalChannelInfo {
    pub capacity: i64,
    pub commit_transaction_fee: i64,
    pub commit_transaction_weight: i64,
    pub cooperative_close_address: Option<String>,
    pub id: String,
    pub is_active: bool,
    pub is_partner_initiated: bool,
    pub is_private: bool,
    pub is_static_remote_key: Option<bool>,
    pub local_balance: i64,
    pub local_given: Option<i64>,
    pub local_reserve: i64,
    /// Hex public key of the channel partner
    pub partner_public_key: String,
    pub received: i64,
    pub remote_balance: i64,
    pub remote_given: Option<i64>,
    pub remote_reserve: i64,
    pub sent: i64,
    pub transaction_id: String,
    pub transaction_vout: u32,
    pub unsettled_balance: i64,
}

/// Snapshot of the public network graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkGraph {
    pub channels: Vec<ChannelInfo>,
    /// Hex public keys of every known node
    pub nodes: Vec<String>,
}

/// Producer of fresh observations.
pub trait LightningSource {
    /// Hex public key of the local node.
    fn identity(&self) -> Result<String, SourceError>;

    fn node(&self, public_key: &str) -> Result<Option<NodeInfo>, SourceError>;

    fn channel(&self, id: &str) -> Result<Option<ChannelInfo>, SourceError>;

    fn peers(&self) -> Result<Vec<PeerInfo>, SourceError>;

    fn local_channels(&self) -> Result<Vec<LocalChannelInfo>, SourceError>;

    fn graph(&self) -> Result<NetworkGraph, SourceError>;
}

impl<T: LightningSource + ?Sized> LightningSource for &T {
    fn identity(&self) -> Result<String, SourceError> {
        (**self).identity()
    }

    fn node(&self, public_key: &str) -> Result<Option<NodeInfo>, SourceError> {
        (**self).node(public_key)
    }

    fn channel(&self, id: &str) -> Result<Option<ChannelInfo>, SourceError> {
        (**self).channel(id)
    }

    fn peers(&self) -> Result<Vec<PeerInfo>, SourceError> {
        (**self).peers()
    }

    fn local_channels(&self) -> Result<Vec<LocalChannelInfo>, SourceError> {
        (**self).local_channels()
    }

    fn graph(&self) -> Result<NetworkGraph, SourceError> {
        (**self).graph()
    }
}
