//! Application shell tying an [`AccountStore`] to an [`AccountRepository`].
//!
//! A session is built once at startup and handed to whatever needs the
//! accounts. It hydrates the store from the repository, and saves the state
//! after every mutating call. Save failures are logged and otherwise ignored:
//! the in-memory change always stands.

use log::{info, warn};

use crate::account_model::{Account, AccountPatch, AccountsState, NewAccount};
use crate::account_store::AccountStore;
use crate::app_response::AppResponse;
use crate::blob_store::LmdbBlobStore;
use crate::config::StoreConfig;
use crate::repository::{AccountRepository, BlobAccountRepository};

/// Session persisted in an LMDB environment, as opened by the FFI layer.
pub type LmdbAccountSession = AccountSession<BlobAccountRepository<LmdbBlobStore>>;

pub struct AccountSession<R> {
    store: AccountStore,
    repository: R,
    config: StoreConfig,
}

impl<R: AccountRepository> AccountSession<R> {
    /// Hydrates a session from `repository`.
    ///
    /// An absent or unreadable persisted state yields an empty store. The
    /// loaded state is then passed through
    /// [`AccountStore::initialize`] and saved back if it needed repair.
    pub fn open(repository: R, config: StoreConfig) -> Self {
        let state = match repository.load() {
            Ok(state) => {
                info!(
                    "Loaded {} accounts (next id {}, version {})",
                    state.accounts.len(),
                    state.next_id,
                    state.version
                );
                state
            }
            Err(AppResponse::NotFound(msg)) => {
                info!("Starting with an empty account store: {}", msg);
                AccountsState::default()
            }
            Err(e) => {
                warn!("Discarding unreadable account state: {}", e);
                AccountsState::default()
            }
        };

        let store = AccountStore::from_state(state)
            .with_label_error_placement(config.label_error_placement);
        let mut session = Self {
            store,
            repository,
            config,
        };

        if session.store.initialize() {
            warn!("Repaired persisted account state on load");
            session.persist();
        }
        session
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn accounts(&self) -> &[Account] {
        self.store.accounts()
    }

    pub fn get(&self, id: u64) -> Option<&Account> {
        self.store.get(id)
    }

    pub fn next_id(&self) -> u64 {
        self.store.next_id()
    }

    pub fn version(&self) -> u32 {
        self.store.version()
    }

    pub fn add_account(&mut self, draft: NewAccount) -> Option<u64> {
        let id = self.store.add_account(draft)?;
        self.persist();
        Some(id)
    }

    pub fn update_account(&mut self, id: u64, patch: AccountPatch) {
        self.store.update_account(id, patch);
        self.persist();
    }

    pub fn remove_account(&mut self, id: u64) {
        self.store.remove_account(id);
        self.persist();
    }

    pub fn validate_account(&mut self, id: u64) -> bool {
        let valid = self.store.validate_account(id);
        if self.config.persist_on_validate && self.store.get(id).is_some() {
            self.persist();
        }
        valid
    }

    pub fn clear_accounts(&mut self) {
        self.store.clear_accounts();
        info!("Cleared all accounts");
        self.persist();
    }

    pub fn initialize(&mut self) -> bool {
        let repaired = self.store.initialize();
        if repaired {
            self.persist();
        }
        repaired
    }

    /// Saves the current state, returning the outcome instead of logging it.
    pub fn flush(&self) -> Result<(), AppResponse> {
        self.repository.save(self.store.state())
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            warn!("Failed to persist account state: {}", e);
        }
    }
}

impl LmdbAccountSession {
    /// Opens (or creates) the LMDB environment `{name}.lmdb` and hydrates a
    /// session from it.
    pub fn open_lmdb(name: &str, config: StoreConfig) -> Result<Self, AppResponse> {
        let blobs = LmdbBlobStore::open(name, config.map_size)?;
        let repository = BlobAccountRepository::with_key(blobs, config.storage_key.clone());
        Ok(Self::open(repository, config))
    }
}
