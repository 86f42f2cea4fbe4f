//! Record store over an LMDB environment
//!
//! [`Store`] is the public face of the crate: typed records in, typed records
//! out, one transaction per call. Tables are LMDB named databases created on
//! first write; reading a table that was never written behaves like reading
//! an empty one.

use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::changes::{expect_mismatch, Changes};
use crate::codec::{self, CodecError};
use crate::config::StoreConfig;
use crate::engine::{open_environment, Environment};
use crate::error::{ConflictReason, StoreError, StoreResult};
use crate::key::Key;
use crate::query::{Query, Row};
use crate::value::Record;

/// Longest accepted table name.
pub const MAX_TABLE_NAME: usize = 64;

/// Entry count of one table and the size of the map it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub entries: u64,
    /// Current LMDB map size in bytes
    pub map_size: usize,
}

/// Handle to the records stored under one database directory.
///
/// Cheap to clone; every clone shares the same environment. All methods take
/// `&self` and are safe to call from many threads at once. Writes serialize
/// inside LMDB.
#[derive(Clone)]
pub struct Store {
    env: Arc<Environment>,
}

impl Store {
    /// Open or create the store at `path`.
    ///
    /// Opening the same directory twice in one process returns handles to
    /// the same environment; the configuration of the first open wins.
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> StoreResult<Self> {
        let env = open_environment(path.as_ref(), &config)?;
        Ok(Self { env })
    }

    /// Close the environment registered for `path`. See [`crate::close`].
    pub fn close<P: AsRef<Path>>(path: P) -> bool {
        crate::engine::close(path)
    }

    pub fn path(&self) -> &Path {
        self.env.path()
    }

    pub fn config(&self) -> &StoreConfig {
        self.env.config()
    }

    /// Current LMDB map size in bytes.
    pub fn map_size(&self) -> usize {
        self.env.map_size()
    }

    /// Load the record at `key`.
    pub fn get(&self, table: &str, key: &Key) -> StoreResult<Option<Record>> {
        check_table(table)?;

        self.env.read("get", |txn| {
            let Some(db) = self.env.open_table(txn, table)? else {
                return Ok(None);
            };
            match db.get(txn, key.as_bytes()).map_err(StoreError::engine("get"))? {
                Some(bytes) => decode(table, bytes).map(Some),
                None => Ok(None),
            }
        })
    }

    /// Store `record` at `key`, replacing whatever was there.
    ///
    /// With `fresh`, the write is refused if the stored record already
    /// defines any of the listed attributes; the conflict carries the stored
    /// record and nothing is written.
    pub fn put(&self, table: &str, key: &Key, record: &Record, fresh: Option<&[&str]>) -> StoreResult<()> {
        check_table(table)?;
        let bytes = encode(record)?;

        self.env.write("put", |txn| {
            let db = self.env.create_table(txn, table)?;

            let existing = match db.get(txn, key.as_bytes()).map_err(StoreError::engine("put"))? {
                Some(bytes) => Some(decode(table, bytes)?),
                None => None,
            };

            if let Some(stored) = existing {
                if let Some(attribute) = fresh.and_then(|attrs| attrs.iter().find(|a| stored.contains(a))) {
                    debug!(table, key = %key, attribute, "fresh constraint violated");
                    return Err(StoreError::Conflict {
                        table: table.to_owned(),
                        reason: ConflictReason::FreshViolation { attribute: (*attribute).to_owned() },
                        stored: Box::new(stored),
                    });
                }
                db.delete(txn, key.as_bytes()).map_err(StoreError::engine("put"))?;
            }

            db.put(txn, key.as_bytes(), &bytes).map_err(StoreError::engine("put"))
        })
    }

    /// Apply `changes` to the record at `key` and return the updated record.
    ///
    /// Updates never create: a missing record is [`StoreError::NotFound`].
    /// With `expect`, every listed attribute must match the stored value
    /// (lists as sets) or the update fails with a conflict carrying the
    /// stored record.
    pub fn update(
        &self,
        table: &str,
        key: &Key,
        changes: &Changes,
        expect: Option<&Record>,
    ) -> StoreResult<Record> {
        check_table(table)?;

        self.env.write("update", |txn| {
            let not_found = || StoreError::NotFound { table: table.to_owned() };

            let db = self.env.open_table(txn, table)?.ok_or_else(not_found)?;
            let stored = match db.get(txn, key.as_bytes()).map_err(StoreError::engine("update"))? {
                Some(bytes) => decode(table, bytes)?,
                None => return Err(not_found()),
            };

            if let Some(attribute) = expect.and_then(|expect| expect_mismatch(&stored, expect)) {
                debug!(table, key = %key, attribute, "update expectation failed");
                return Err(StoreError::Conflict {
                    table: table.to_owned(),
                    reason: ConflictReason::ExpectMismatch { attribute: attribute.to_owned() },
                    stored: Box::new(stored),
                });
            }

            let updated = changes.apply(&stored)?;
            let bytes = encode(&updated)?;
            db.put(txn, key.as_bytes(), &bytes).map_err(StoreError::engine("update"))?;
            Ok(updated)
        })
    }

    /// Delete the record at `key`. Returns whether anything was deleted.
    pub fn remove(&self, table: &str, key: &Key) -> StoreResult<bool> {
        check_table(table)?;

        self.env.write("remove", |txn| match self.env.open_table(txn, table)? {
            Some(db) => db.delete(txn, key.as_bytes()).map_err(StoreError::engine("remove")),
            None => Ok(false),
        })
    }

    /// Scan `table` in ascending key order.
    ///
    /// At most `limit` keys are read from the range; `where` predicates then
    /// drop non-matching records, so fewer than `limit` rows may come back.
    pub fn query(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        check_table(table)?;
        if query.limit == Some(0) {
            return Ok(Vec::new());
        }

        self.env.read("query", |txn| {
            let Some(db) = self.env.open_table(txn, table)? else {
                return Ok(Vec::new());
            };

            let start = match &query.key_prefix {
                Some(prefix) => Bound::Included(prefix.as_slice()),
                None => Bound::Unbounded,
            };
            let range = (start, Bound::<&[u8]>::Unbounded);

            // The limit bounds the keys taken from the range; `where` filters them after
            let mut rows = Vec::new();
            let mut scanned = 0usize;
            for entry in db.range(txn, &range).map_err(StoreError::engine("query"))? {
                let (key, bytes) = entry.map_err(StoreError::engine("query"))?;
                if query.past_end(key) || query.limit.is_some_and(|limit| scanned >= limit) {
                    break;
                }
                scanned += 1;

                let record = decode(table, bytes)?;
                if query.matches(&record) {
                    rows.push(Row { key: key.to_vec(), record });
                }
            }
            Ok(rows)
        })
    }

    /// Number of records in `table`.
    pub fn len(&self, table: &str) -> StoreResult<u64> {
        check_table(table)?;

        self.env.read("len", |txn| match self.env.open_table(txn, table)? {
            Some(db) => db.len(txn).map_err(StoreError::engine("len")),
            None => Ok(0),
        })
    }

    pub fn stats(&self, table: &str) -> StoreResult<TableStats> {
        Ok(TableStats { entries: self.len(table)?, map_size: self.map_size() })
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.env.path())
            .field("map_size", &self.env.map_size())
            .finish()
    }
}

fn check_table(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.len() > MAX_TABLE_NAME {
        return Err(StoreError::validation(format!(
            "table name must be 1..={} bytes, got {}",
            MAX_TABLE_NAME,
            name.len()
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(StoreError::validation(format!("table name `{}` has invalid characters", name)));
    }
    Ok(())
}

fn encode(record: &Record) -> StoreResult<Vec<u8>> {
    codec::encode(record).map_err(|e| StoreError::validation(e.to_string()))
}

fn decode(table: &str, bytes: &[u8]) -> StoreResult<Record> {
    codec::decode(bytes).map_err(|e: CodecError| StoreError::Corrupted {
        table: table.to_owned(),
        message: e.to_string(),
    })
}
