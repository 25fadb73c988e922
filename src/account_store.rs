//! In-memory account collection.
//!
//! [`AccountStore`] owns the records, the next-id counter and the schema
//! version. It knows nothing about storage: the
//! [`AccountSession`](crate::session::AccountSession) saves its
//! [`state`](AccountStore::state) after each mutation.
//!
//! Unknown ids are tolerated everywhere: `update_account` and `remove_account`
//! do nothing and `validate_account` returns `false`.

use log::{debug, warn};

use crate::account_model::{
    Account, AccountErrors, AccountPatch, AccountType, AccountsState, NewAccount, FIRST_ID,
};
use crate::account_validation;
use crate::config::LabelErrorPlacement;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStore {
    state: AccountsState,
    label_error_placement: LabelErrorPlacement,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a previously persisted state as-is. Call
    /// [`initialize`](Self::initialize) before use if it may be damaged.
    pub fn from_state(state: AccountsState) -> Self {
        Self {
            state,
            label_error_placement: LabelErrorPlacement::default(),
        }
    }

    pub fn with_label_error_placement(mut self, placement: LabelErrorPlacement) -> Self {
        self.label_error_placement = placement;
        self
    }

    pub fn accounts(&self) -> &[Account] {
        &self.state.accounts
    }

    pub fn get(&self, id: u64) -> Option<&Account> {
        self.state.accounts.iter().find(|account| account.id == id)
    }

    pub fn next_id(&self) -> u64 {
        self.state.next_id
    }

    pub fn version(&self) -> u32 {
        self.state.version
    }

    pub fn state(&self) -> &AccountsState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.state.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.accounts.is_empty()
    }

    /// Appends a new record and returns its id.
    ///
    /// LDAP drafts lose any password they carry. The record starts out
    /// unvalidated (`is_valid == false`, no errors). Returns `None`, without
    /// appending, only when the counter can no longer advance; a state that
    /// went through [`initialize`](Self::initialize) never gets there.
    pub fn add_account(&mut self, draft: NewAccount) -> Option<u64> {
        let id = self.state.next_id;
        let Some(next_id) = id.checked_add(1) else {
            warn!("Account id space exhausted at {}; account not added", id);
            return None;
        };
        self.state.next_id = next_id;

        let password = match draft.kind {
            AccountType::Ldap => None,
            AccountType::Local => draft.password,
        };

        self.state.accounts.push(Account {
            id,
            label: draft.label.unwrap_or_default(),
            kind: draft.kind,
            username: draft.username,
            password,
            is_valid: false,
            errors: AccountErrors::default(),
        });

        debug!("Added {:?} account with id {}", draft.kind, id);
        Some(id)
    }

    /// Overwrites the supplied fields of the record with `id`.
    ///
    /// Validation status is not refreshed. If the patch leaves the record as
    /// LDAP, its password is cleared.
    pub fn update_account(&mut self, id: u64, patch: AccountPatch) {
        let Some(account) = self.find_mut(id) else {
            debug!("update_account: no account with id {}", id);
            return;
        };

        patch.apply_to(account);
        if account.is_ldap() {
            account.password = None;
        }
        debug!("Updated account {}", id);
    }

    pub fn remove_account(&mut self, id: u64) {
        let before = self.state.accounts.len();
        self.state.accounts.retain(|account| account.id != id);
        if self.state.accounts.len() == before {
            debug!("remove_account: no account with id {}", id);
        } else {
            debug!("Removed account {}", id);
        }
    }

    /// Runs the field rules on the record with `id`, stores the outcome on
    /// the record and returns whether it passed.
    pub fn validate_account(&mut self, id: u64) -> bool {
        let placement = self.label_error_placement;
        let Some(account) = self.find_mut(id) else {
            return false;
        };

        let outcome = account_validation::validate(account, placement);
        account.errors = outcome.errors;
        account.is_valid = outcome.is_valid;
        debug!("Validated account {}: valid={}", id, outcome.is_valid);
        outcome.is_valid
    }

    pub fn clear_accounts(&mut self) {
        self.state.accounts.clear();
        self.state.next_id = FIRST_ID;
    }

    /// Repairs a damaged state; leaves a well-formed one untouched.
    ///
    /// A zero counter becomes 1, and a counter that does not exceed every
    /// stored id is raised past the largest one. A state whose counter cannot
    /// advance (an id or counter at `u64::MAX`) is corrupt and is replaced by
    /// the empty default. Returns `true` if anything changed.
    pub fn initialize(&mut self) -> bool {
        let mut repaired = false;

        if self.state.next_id == 0 {
            self.state.next_id = FIRST_ID;
            repaired = true;
        }

        if let Some(max_id) = self.state.accounts.iter().map(|account| account.id).max() {
            if self.state.next_id <= max_id {
                match max_id.checked_add(1) {
                    Some(next_id) => self.state.next_id = next_id,
                    None => self.reset_corrupt("stored account id"),
                }
                repaired = true;
            }
        }

        if self.state.next_id == u64::MAX {
            self.reset_corrupt("id counter");
            repaired = true;
        }

        repaired
    }

    fn reset_corrupt(&mut self, what: &str) {
        warn!(
            "Discarding {} accounts: {} is at the end of the id space",
            self.state.accounts.len(),
            what
        );
        self.state = AccountsState::default();
    }

    fn find_mut(&mut self, id: u64) -> Option<&mut Account> {
        self.state.accounts.iter_mut().find(|account| account.id == id)
    }
}
