//! # lnstore-core
//!
//! Transactional record store over LMDB.
//!
//! Records are flat attribute maps ([`Record`]) encoded as CBOR and stored
//! under fixed-width sha256 keys ([`Key`]) in named tables. Writes support
//! two concurrency guards:
//!
//! - **fresh**: a create refuses to overwrite a record that already defines
//!   one of the listed attributes
//! - **expect**: an update only applies when the stored record still holds
//!   the expected values (typically `_rev`)
//!
//! When LMDB reports the memory map as full, the store grows the map and
//! returns [`StoreError::CapacityExhausted`]; the caller retries the write.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lnstore_core::{Changes, Key, Record, Store, StoreConfig};
//!
//! let store = Store::open("/tmp/lnstore", StoreConfig::default()).unwrap();
//! let key = Key::derive("node", "02abc").unwrap();
//!
//! store.put("nodes", &key, &Record::new().with("_rev", 0i64).with("alias", "a"), Some(&["alias"])).unwrap();
//!
//! let expect = Record::new().with("_rev", 0i64);
//! store.update("nodes", &key, &Changes::new().bump_rev().set("alias", "b"), Some(&expect)).unwrap();
//!
//! lnstore_core::shutdown();
//! ```

pub mod changes;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod key;
pub mod query;
pub mod value;

mod engine;

pub use changes::{expect_mismatch, Change, Changes};
pub use config::StoreConfig;
pub use database::{Store, TableStats};
pub use engine::{close, shutdown};
pub use error::{ConflictReason, ErrorKind, StoreError, StoreResult};
pub use key::{Key, ID_SEPARATOR, KEY_LEN};
pub use query::{Predicate, Query, Row};
pub use value::{Record, Value, REV};
