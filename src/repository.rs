//! Persistence of [`AccountsState`] through a [`BlobStore`].
//!
//! The whole state is one JSON blob under a single key. Loading an absent or
//! malformed blob is an error the caller recovers from; it never panics.

use log::debug;

use crate::account_model::AccountsState;
use crate::app_response::AppResponse;
use crate::blob_store::BlobStore;
use crate::config::DEFAULT_STORAGE_KEY;

/// Explicit load/save boundary between the store and its storage medium.
pub trait AccountRepository {
    /// Reads the persisted state.
    ///
    /// # Errors
    ///
    /// * [`AppResponse::NotFound`] if nothing has been persisted yet
    /// * [`AppResponse::SerializationError`] if the blob cannot be decoded
    /// * [`AppResponse::DatabaseError`] if the medium is unavailable
    fn load(&self) -> Result<AccountsState, AppResponse>;

    fn save(&self, state: &AccountsState) -> Result<(), AppResponse>;
}

/// Encodes the persisted fields as JSON text.
pub fn serialize_state(state: &AccountsState) -> Result<String, AppResponse> {
    Ok(serde_json::to_string(state)?)
}

pub fn deserialize_state(blob: &str) -> Result<AccountsState, AppResponse> {
    Ok(serde_json::from_str(blob)?)
}

/// [`AccountRepository`] storing the state under one key of a [`BlobStore`].
pub struct BlobAccountRepository<S> {
    store: S,
    key: String,
}

impl<S: BlobStore> BlobAccountRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn blob_store(&self) -> &S {
        &self.store
    }

    /// Deletes the persisted blob. Returns `true` if one existed.
    pub fn purge(&self) -> Result<bool, AppResponse> {
        self.store.remove(&self.key)
    }
}

impl<S: BlobStore> AccountRepository for BlobAccountRepository<S> {
    fn load(&self) -> Result<AccountsState, AppResponse> {
        match self.store.get(&self.key)? {
            Some(blob) => deserialize_state(&blob),
            None => Err(AppResponse::NotFound(format!(
                "No persisted state under key '{}'",
                self.key
            ))),
        }
    }

    fn save(&self, state: &AccountsState) -> Result<(), AppResponse> {
        let blob = serialize_state(state)?;
        self.store.set(&self.key, &blob)?;
        debug!("Saved {} accounts under key '{}'", state.accounts.len(), self.key);
        Ok(())
    }
}
