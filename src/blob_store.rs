//! String-keyed blob storage backing the account repository.
//!
//! [`LmdbBlobStore`] keeps blobs in an LMDB environment on disk and is what
//! the FFI layer opens. [`MemoryBlobStore`] keeps them in a map and is meant
//! for hosts without durable storage and for tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info};

use crate::app_response::AppResponse;

/// Opaque key-value medium holding text blobs.
pub trait BlobStore {
    /// Returns the blob stored under `key`, or `None` if there is none.
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse>;

    /// Stores `value` under `key`, replacing any previous blob.
    fn set(&self, key: &str, value: &str) -> Result<(), AppResponse>;

    /// Deletes the blob under `key`. Returns `true` if one existed.
    fn remove(&self, key: &str) -> Result<bool, AppResponse>;
}

/// LMDB-backed blob store.
///
/// The environment lives in the directory `{name}.lmdb`, created on open if
/// missing. Every write commits its own transaction and syncs to disk.
pub struct LmdbBlobStore {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbBlobStore {
    pub fn open(name: &str, map_size: usize) -> Result<Self, AppResponse> {
        if name.trim().is_empty() {
            return Err(AppResponse::BadRequest("Database name must not be empty".to_string()));
        }

        let path = PathBuf::from(format!("{name}.lmdb"));
        fs::create_dir_all(&path)?;

        let env = Environment::new().set_map_size(map_size).open(&path)?;
        let db = env.create_db(None, DatabaseFlags::empty())?;

        info!("Opened LMDB environment at {}", path.display());
        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes pending writes to disk.
    pub fn sync(&self) -> Result<(), AppResponse> {
        self.env.sync(true)?;
        Ok(())
    }
}

impl BlobStore for LmdbBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let blob = match txn.get(self.db, &key) {
            Ok(bytes) => std::str::from_utf8(bytes)
                .map(|s| Some(s.to_owned()))
                .map_err(|e| {
                    AppResponse::SerializationError(format!("Invalid UTF-8 under key '{key}': {e}"))
                })?,
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.abort();
        Ok(blob)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        self.sync()?;
        debug!("Stored {} bytes under key '{}'", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        let existed = match txn.del(self.db, &key, None) {
            Ok(()) => true,
            Err(lmdb::Error::NotFound) => false,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.commit()?;
        self.sync()?;
        Ok(existed)
    }
}

/// In-memory blob store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppResponse {
    AppResponse::DatabaseError("Memory blob store lock poisoned".to_string())
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AppResponse> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        Ok(blobs.remove(key).is_some())
    }
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, AppResponse> {
        (**self).remove(key)
    }
}
