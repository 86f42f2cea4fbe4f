//! # lnstore-sync
//!
//! Keeps an [`lnstore_core::Store`] in step with a Lightning node.
//!
//! Every entity kind follows the same cycle: derive the record key, load the
//! stored record, fetch a fresh observation, then create, update or leave
//! the record alone. Only the attributes a kind declares mutable are ever
//! diffed, and every write is guarded (`fresh` on create, `_rev` on update)
//! so concurrent syncers never lose each other's changes. [`Syncer`] wraps
//! each reconciliation in a bounded retry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lnstore_core::{Store, StoreConfig};
//! use lnstore_sync::{LightningSource, Syncer};
//!
//! fn mirror<S: LightningSource>(source: S) -> lnstore_sync::SyncResult<()> {
//!     let store = Store::open("/var/lib/lnstore", StoreConfig::server())?;
//!     let syncer = Syncer::new(store, source);
//!
//!     let summary = syncer.sync_current_records()?;
//!     println!("{} channels created", summary.channels.created);
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod channel;
pub mod diff;
pub mod error;
pub mod htlc;
pub mod local_channel;
pub mod node;
pub mod outcome;
pub mod peer;
pub mod policy;
pub mod retry;
pub mod schema;
pub mod source;
pub mod syncer;

mod reconcile;

pub use block::sync_block;
pub use channel::{mark_channel_closed, sync_channel, ClosedChannel};
pub use diff::{diff, ChangeSet};
pub use error::{SyncError, SyncResult};
pub use htlc::{update_forward_htlc, update_payment_htlc, update_receive_htlc, ForwardHtlc, PaymentHtlc, ReceiveHtlc};
pub use local_channel::sync_local_channel;
pub use node::sync_node;
pub use outcome::SyncOutcome;
pub use peer::sync_peer;
pub use policy::sync_policy;
pub use retry::{retry, RetryPolicy};
pub use schema::Schema;
pub use source::{LightningSource, SourceError};
pub use syncer::{KindSummary, SyncSummary, Syncer};
