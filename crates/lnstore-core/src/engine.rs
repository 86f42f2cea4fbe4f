//! LMDB environment handling
//!
//! One [`Environment`] exists per database directory in the process. It is
//! opened lazily by [`open_environment`], cached in a process-wide registry,
//! and only closed by an explicit [`close`] or [`shutdown`].
//!
//! **Transactions**: every operation runs inside exactly one transaction that
//! is committed or aborted before control returns to the caller.
//! **Growth**: the map is resized only while the resize gate is held
//! exclusively, so no transaction of this process is open during a resize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{round_to_granule, StoreConfig};
use crate::error::{is_map_limit, StoreError, StoreResult};

/// Byte-keyed, byte-valued LMDB table.
pub(crate) type Table = Database<Bytes, Bytes>;

/// LMDB data file inside an environment directory.
const DATA_FILE: &str = "data.mdb";

static REGISTRY: Lazy<Mutex<HashMap<PathBuf, Arc<Environment>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// An open LMDB environment plus the gate that orders resizes against
/// transactions.
pub(crate) struct Environment {
    env: Env,
    /// Shared by every transaction, exclusive during resize
    gate: RwLock<()>,
    path: PathBuf,
    config: StoreConfig,
}

impl Environment {
    fn open(path: &Path, config: &StoreConfig) -> StoreResult<Self> {
        // Never ask for less than what is already on disk plus one step
        let on_disk = std::fs::metadata(path.join(DATA_FILE))
            .map(|m| usize::try_from(m.len()).unwrap_or(usize::MAX))
            .unwrap_or(0);
        let map_size =
            round_to_granule(config.initial_map_size.max(on_disk.saturating_add(config.growth_increment)));

        // SAFETY: the registry guarantees a single open per canonical path in
        // this process, and the directory is owned by the store.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(config.max_tables)
                .max_readers(config.max_readers)
                .open(path)
        }
        .map_err(StoreError::engine("open"))?;

        info!(path = %path.display(), map_size, "opened lnstore environment");

        Ok(Self {
            env,
            gate: RwLock::new(()),
            path: path.to_path_buf(),
            config: config.clone(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn map_size(&self) -> usize {
        self.env.info().map_size
    }

    /// Open `name` for reading; `None` when it was never written.
    pub(crate) fn open_table(&self, txn: &RoTxn, name: &str) -> StoreResult<Option<Table>> {
        self.env.open_database(txn, Some(name)).map_err(StoreError::engine("open table"))
    }

    /// Open `name` inside a write transaction, creating it if needed.
    pub(crate) fn create_table(&self, txn: &mut RwTxn, name: &str) -> StoreResult<Table> {
        self.env.create_database(txn, Some(name)).map_err(StoreError::engine("create table"))
    }

    /// Run `f` inside a read transaction.
    pub(crate) fn read<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&RoTxn) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _gate = self.gate.read();
        let rtxn = self.env.read_txn().map_err(StoreError::engine(operation))?;

        match f(&rtxn) {
            Ok(out) => {
                // Commit keeps table handles opened in this transaction valid
                rtxn.commit().map_err(|source| StoreError::Close { operation, source })?;
                Ok(out)
            }
            Err(err) => {
                drop(rtxn);
                Err(err)
            }
        }
    }

    /// Run `f` inside a write transaction and commit it.
    ///
    /// When LMDB reports the map as full, the transaction is aborted, the map
    /// is grown and [`StoreError::CapacityExhausted`] is returned so the
    /// caller can retry the whole write.
    pub(crate) fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut RwTxn) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let observed = {
            let _gate = self.gate.read();
            let observed = self.map_size();

            match self.env.write_txn() {
                Err(source) if is_map_limit(&source) => observed,
                Err(source) => return Err(StoreError::Engine { operation, source }),
                Ok(mut wtxn) => match f(&mut wtxn) {
                    Ok(out) => match wtxn.commit() {
                        Ok(()) => return Ok(out),
                        Err(source) if is_map_limit(&source) => observed,
                        Err(source) => return Err(StoreError::Engine { operation: "commit", source }),
                    },
                    Err(err) if err.is_map_limit() => {
                        wtxn.abort();
                        observed
                    }
                    Err(err) => {
                        wtxn.abort();
                        return Err(err);
                    }
                },
            }
        };

        self.after_map_limit(operation, observed)
    }

    fn after_map_limit<T>(&self, operation: &'static str, observed: usize) -> StoreResult<T> {
        self.grow(observed)?;
        Err(StoreError::CapacityExhausted { operation, map_size: self.map_size() })
    }

    /// Grow the map to at least current usage plus one increment.
    ///
    /// `observed` is the map size seen when the failing transaction began;
    /// if the map is already larger, someone else grew it and this is a no-op.
    pub(crate) fn grow(&self, observed: usize) -> StoreResult<()> {
        let _gate = self.gate.write();

        let current = self.map_size();
        if current > observed {
            debug!(path = %self.path.display(), current, observed, "map already grown");
            return Ok(());
        }

        let on_disk = self.env.real_disk_size().map_err(StoreError::engine("disk size"))?;
        let used = current.max(usize::try_from(on_disk).unwrap_or(usize::MAX));
        let target = round_to_granule(used.saturating_add(self.config.growth_increment));

        // SAFETY: the exclusive gate guarantees no transaction from this
        // process is open while the map is resized.
        unsafe { self.env.resize(target) }.map_err(StoreError::engine("resize"))?;

        warn!(path = %self.path.display(), from = current, to = target, "lnstore map grown");
        Ok(())
    }
}

/// Open (or reuse) the environment for `path`.
///
/// The directory is created if missing. Paths are canonicalised so two
/// spellings of the same directory share one environment.
pub(crate) fn open_environment(path: &Path, config: &StoreConfig) -> StoreResult<Arc<Environment>> {
    config.validate()?;

    std::fs::create_dir_all(path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    let path = path.canonicalize().map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;

    let mut registry = REGISTRY.lock();
    if let Some(env) = registry.get(&path) {
        return Ok(Arc::clone(env));
    }

    let env = Arc::new(Environment::open(&path, config)?);
    registry.insert(path, Arc::clone(&env));
    Ok(env)
}

/// Close the environment registered for `path`.
///
/// Returns `false` when nothing was open there, or when live stores still
/// hold the environment. An environment in use stays registered, so the next
/// open of `path` reuses it.
pub fn close<P: AsRef<Path>>(path: P) -> bool {
    let Ok(path) = path.as_ref().canonicalize() else {
        return false;
    };

    // Held until the environment is gone so a concurrent open cannot race it
    let mut registry = REGISTRY.lock();
    let Some(env) = registry.remove(&path) else {
        return false;
    };
    match release(env) {
        Ok(()) => true,
        Err(env) => {
            registry.insert(path, env);
            false
        }
    }
}

/// Close every registered environment that no store still holds. Call before
/// process exit.
pub fn shutdown() {
    let mut registry = REGISTRY.lock();
    let envs: Vec<_> = registry.drain().collect();
    for (path, env) in envs {
        if let Err(env) = release(env) {
            registry.insert(path, env);
        }
    }
}

/// Close `env` if this is the last handle; otherwise hand it back.
fn release(env: Arc<Environment>) -> Result<(), Arc<Environment>> {
    let env = Arc::try_unwrap(env).map_err(|env| {
        debug!(path = %env.path.display(), "environment still in use, left open");
        env
    })?;

    let path = env.path.clone();
    env.env.prepare_for_closing().wait();
    info!(path = %path.display(), "closed lnstore environment");
    Ok(())
}
