//! Retried entry points and bulk sync
//!
//! [`Syncer`] pairs a [`Store`] with the node being mirrored and runs every
//! reconciliation through [`retry`].

use std::fmt;
use std::time::Duration;

use lnstore_core::Store;
use rand::seq::SliceRandom;
use tracing::info;

use crate::block::sync_block;
use crate::channel::{mark_channel_closed, sync_channel, ClosedChannel};
use crate::error::{SyncError, SyncResult};
use crate::htlc::{update_forward_htlc, update_payment_htlc, update_receive_htlc, ForwardHtlc, PaymentHtlc, ReceiveHtlc};
use crate::local_channel::sync_local_channel;
use crate::node::sync_node;
use crate::outcome::SyncOutcome;
use crate::peer::sync_peer;
use crate::policy::sync_policy;
use crate::retry::{retry, RetryPolicy};
use crate::schema::PEER;
use crate::source::LightningSource;

type Sleep = Box<dyn Fn(Duration) + Send + Sync>;

/// Outcome counts for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl KindSummary {
    fn record(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Created(_) => self.created += 1,
            SyncOutcome::Updated { .. } => self.updated += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Result of [`Syncer::sync_current_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub nodes: KindSummary,
    pub channels: KindSummary,
    pub policies: KindSummary,
    pub peers: KindSummary,
}

/// Store plus source, with conflict retries.
pub struct Syncer<S> {
    store: Store,
    source: S,
    retry: RetryPolicy,
    sleep: Sleep,
}

impl<S: LightningSource> Syncer<S> {
    pub fn new(store: Store, source: S) -> Self {
        Self {
            store,
            source,
            retry: RetryPolicy::default(),
            sleep: Box::new(std::thread::sleep),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the conflict delay, e.g. with a no-op in tests.
    pub fn with_sleep<F>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn retried<T>(&self, op: impl FnMut() -> SyncResult<T>) -> SyncResult<T> {
        retry(&self.retry, |delay| (self.sleep)(delay), op)
    }

    pub fn node(&self, public_key: &str) -> SyncResult<SyncOutcome> {
        self.retried(|| sync_node(&self.store, &self.source, public_key))
    }

    pub fn channel(&self, id: &str) -> SyncResult<SyncOutcome> {
        self.retried(|| sync_channel(&self.store, &self.source, id))
    }

    pub fn policy(&self, public_key: &str, channel_id: &str) -> SyncResult<SyncOutcome> {
        self.retried(|| sync_policy(&self.store, &self.source, public_key, channel_id))
    }

    pub fn peer(&self, public_key: &str) -> SyncResult<SyncOutcome> {
        self.retried(|| sync_peer(&self.store, &self.source, public_key))
    }

    pub fn local_channel(&self, public_key: &str, transaction_id: &str, transaction_vout: u32) -> SyncResult<SyncOutcome> {
        self.retried(|| sync_local_channel(&self.store, &self.source, public_key, transaction_id, transaction_vout))
    }

    pub fn block(&self, id: &str, height: u32) -> SyncResult<SyncOutcome> {
        self.retried(|| sync_block(&self.store, id, height))
    }

    pub fn forward_htlc(&self, htlc: &ForwardHtlc) -> SyncResult<SyncOutcome> {
        self.retried(|| update_forward_htlc(&self.store, htlc))
    }

    pub fn payment_htlc(&self, htlc: &PaymentHtlc) -> SyncResult<SyncOutcome> {
        self.retried(|| update_payment_htlc(&self.store, htlc))
    }

    pub fn receive_htlc(&self, htlc: &ReceiveHtlc) -> SyncResult<SyncOutcome> {
        self.retried(|| update_receive_htlc(&self.store, htlc))
    }

    pub fn mark_channel_closed(&self, id: &str, close_height: u32) -> SyncResult<Option<ClosedChannel>> {
        self.retried(|| mark_channel_closed(&self.store, id, close_height))
    }

    /// Reconcile every channel, node, policy and connected peer the source
    /// currently reports.
    ///
    /// Each series is walked in random order so concurrent bulk syncs
    /// against the same store rarely contend on the same keys. The first
    /// error stops the sync.
    pub fn sync_current_records(&self) -> SyncResult<SyncSummary> {
        let graph = self.source.graph().map_err(SyncError::fetch("graph"))?;
        let peers = self.source.peers().map_err(SyncError::fetch(PEER.kind))?;
        let mut rng = rand::thread_rng();

        let mut channels: Vec<&str> = graph.channels.iter().map(|c| c.id.as_str()).collect();
        let mut nodes: Vec<&str> = graph.nodes.iter().map(String::as_str).collect();
        let mut policies: Vec<(&str, &str)> = graph
            .channels
            .iter()
            .flat_map(|c| c.policies.iter().map(move |p| (p.public_key.as_str(), c.id.as_str())))
            .collect();
        let mut peer_keys: Vec<&str> = peers.iter().map(|p| p.public_key.as_str()).collect();

        channels.shuffle(&mut rng);
        nodes.shuffle(&mut rng);
        policies.shuffle(&mut rng);
        peer_keys.shuffle(&mut rng);

        let mut summary = SyncSummary::default();
        for id in channels {
            summary.channels.record(&self.channel(id)?);
        }
        for public_key in nodes {
            summary.nodes.record(&self.node(public_key)?);
        }
        for public_key in peer_keys {
            summary.peers.record(&self.peer(public_key)?);
        }
        for (public_key, channel_id) in policies {
            summary.policies.record(&self.policy(public_key, channel_id)?);
        }

        info!(
            channels = summary.channels.total(),
            nodes = summary.nodes.total(),
            peers = summary.peers.total(),
            policies = summary.policies.total(),
            "synced current records"
        );
        Ok(summary)
    }
}

impl<S> fmt::Debug for Syncer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Syncer")
            .field("store", &self.store)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
