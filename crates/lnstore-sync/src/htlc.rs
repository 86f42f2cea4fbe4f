//! HTLC state tracking
//!
//! Unlike the graph kinds, HTLC observations come from the caller (an event
//! subscription, typically) rather than from a [`LightningSource`] lookup.
//! Fields the event stream only reports on some updates fall back to the
//! stored values so a later, sparser event does not erase them.
//!
//! [`LightningSource`]: crate::source::LightningSource

use lnstore_core::{Record, Store};

use crate::error::SyncResult;
use crate::outcome::SyncOutcome;
use crate::reconcile::reconcile;
use crate::schema::{hex_field, index_field, require, FORWARD_HTLC, PAYMENT_HTLC, RECEIVE_HTLC};

/// HTLC routed through the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardHtlc {
    /// Hex public key of the forwarding node
    pub public_key: String,
    /// ISO 8601 time of the observation
    pub at: String,
    pub in_channel: String,
    pub in_payment: u64,
    pub out_channel: String,
    pub out_payment: u64,
    pub cltv_delta: Option<u32>,
    pub external_failure: Option<String>,
    pub fee_mtokens: Option<String>,
    pub internal_failure: Option<String>,
    pub is_confirmed: bool,
    pub is_failed: bool,
    pub mtokens: Option<String>,
    /// Timeout block height
    pub timeout: Option<u32>,
}

/// HTLC sent by the node for one of its own payments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentHtlc {
    pub public_key: String,
    pub at: String,
    pub out_channel: String,
    pub out_payment: u64,
    pub is_confirmed: bool,
    pub is_failed: bool,
    pub mtokens: Option<String>,
    pub timeout: Option<u32>,
}

/// HTLC received by the node for one of its invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveHtlc {
    pub public_key: String,
    pub at: String,
    pub in_channel: String,
    pub in_payment: u64,
    pub external_failure: Option<String>,
    pub internal_failure: Option<String>,
    pub is_confirmed: bool,
    pub is_failed: bool,
}

/// Record the current state of a forwarded HTLC.
pub fn update_forward_htlc(store: &Store, htlc: &ForwardHtlc) -> SyncResult<SyncOutcome> {
    let schema = &FORWARD_HTLC;
    let public_key = hex_field(schema.kind, "public key", &htlc.public_key)?;
    require(schema.kind, "observation time", &htlc.at)?;
    require(schema.kind, "in channel", &htlc.in_channel)?;
    require(schema.kind, "out channel", &htlc.out_channel)?;
    let in_payment = index_field(schema.kind, "in payment", htlc.in_payment)?;
    let out_payment = index_field(schema.kind, "out payment", htlc.out_payment)?;

    let (in_index, out_index) = (htlc.in_payment.to_string(), htlc.out_payment.to_string());
    let key = schema.key(&[
        htlc.public_key.as_str(),
        &htlc.in_channel,
        &in_index,
        &htlc.out_channel,
        &out_index,
    ])?;
    let stored = store.get(schema.table, &key)?;

    let kept = |attr: &str| stored.as_ref().and_then(|r| r.get(attr)).cloned();
    let mut fresh = Record::new()
        .with_opt("external_failure", htlc.external_failure.clone())
        .with("in_channel", htlc.in_channel.as_str())
        .with("in_payment", in_payment)
        .with_opt("internal_failure", htlc.internal_failure.clone())
        .with("is_confirmed", htlc.is_confirmed)
        .with("is_failed", htlc.is_failed)
        .with("out_channel", htlc.out_channel.as_str())
        .with("out_payment", out_payment)
        .with("public_key", public_key)
        .with("updated_at", htlc.at.as_str());
    fresh.set_opt("cltv_delta", htlc.cltv_delta.map(Into::into).or_else(|| kept("cltv_delta")));
    fresh.set_opt("fee_mtokens", htlc.fee_mtokens.clone().map(Into::into).or_else(|| kept("fee_mtokens")));
    fresh.set_opt("mtokens", htlc.mtokens.clone().map(Into::into).or_else(|| kept("mtokens")));
    fresh.set_opt("timeout", htlc.timeout.map(Into::into).or_else(|| kept("timeout")));

    reconcile(store, schema, &key, stored, Some(fresh))
}

/// Record the current state of an outgoing payment HTLC.
pub fn update_payment_htlc(store: &Store, htlc: &PaymentHtlc) -> SyncResult<SyncOutcome> {
    let schema = &PAYMENT_HTLC;
    let public_key = hex_field(schema.kind, "public key", &htlc.public_key)?;
    require(schema.kind, "observation time", &htlc.at)?;
    require(schema.kind, "out channel", &htlc.out_channel)?;
    let out_payment = index_field(schema.kind, "out payment", htlc.out_payment)?;

    let out_index = htlc.out_payment.to_string();
    let key = schema.key(&[htlc.public_key.as_str(), &htlc.out_channel, &out_index])?;
    let stored = store.get(schema.table, &key)?;

    let kept = |attr: &str| stored.as_ref().and_then(|r| r.get(attr)).cloned();
    let mut fresh = Record::new()
        .with("is_confirmed", htlc.is_confirmed)
        .with("is_failed", htlc.is_failed)
        .with("out_channel", htlc.out_channel.as_str())
        .with("out_payment", out_payment)
        .with("public_key", public_key)
        .with("updated_at", htlc.at.as_str());
    fresh.set_opt("mtokens", htlc.mtokens.clone().map(Into::into).or_else(|| kept("mtokens")));
    fresh.set_opt("timeout", htlc.timeout.map(Into::into).or_else(|| kept("timeout")));

    reconcile(store, schema, &key, stored, Some(fresh))
}

/// Record the current state of an incoming invoice HTLC.
pub fn update_receive_htlc(store: &Store, htlc: &ReceiveHtlc) -> SyncResult<SyncOutcome> {
    let schema = &RECEIVE_HTLC;
    let public_key = hex_field(schema.kind, "public key", &htlc.public_key)?;
    require(schema.kind, "observation time", &htlc.at)?;
    require(schema.kind, "in channel", &htlc.in_channel)?;
    let in_payment = index_field(schema.kind, "in payment", htlc.in_payment)?;

    let in_index = htlc.in_payment.to_string();
    let key = schema.key(&[htlc.public_key.as_str(), &htlc.in_channel, &in_index])?;
    let stored = store.get(schema.table, &key)?;

    let fresh = Record::new()
        .with_opt("external_failure", htlc.external_failure.clone())
        .with("in_channel", htlc.in_channel.as_str())
        .with("in_payment", in_payment)
        .with_opt("internal_failure", htlc.internal_failure.clone())
        .with("is_confirmed", htlc.is_confirmed)
        .with("is_failed", htlc.is_failed)
        .with("public_key", public_key)
        .with("updated_at", htlc.at.as_str());

    reconcile(store, schema, &key, stored, Some(fresh))
}
