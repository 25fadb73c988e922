//! Data model definitions for account records.
//!
//! This module defines the records kept by the
//! [`AccountStore`](crate::account_store::AccountStore) and the exact shape in
//! which they are persisted. The primary model is [`Account`]; [`AccountsState`]
//! is the whole persisted blob.
//!
//! All JSON keys are camelCase (`isValid`, `nextId`) and the account kind is
//! stored under the key `type`, so a blob written by an existing client
//! decodes unchanged.

use serde::{Deserialize, Deserializer, Serialize};

/// Schema version written with every persisted state.
pub const CURRENT_VERSION: u32 = 1;

/// First identifier handed out by an empty store.
pub const FIRST_ID: u64 = 1;

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Authenticated by an external directory; never stores a password.
    Ldap,
    /// Password stored and validated locally.
    Local,
}

/// One entry of an account's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTag {
    pub text: String,
}

impl LabelTag {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Field-level validation messages from the last validation run.
///
/// Serializes as a mapping from field name to message; fields without a
/// message are omitted, so an error-free record serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountErrors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AccountErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.label.is_none()
    }
}

/// A single credential record.
///
/// # Examples
///
/// ```rust
/// use account_store_core::account_model::{Account, AccountType};
///
/// let json = r#"{"id":3,"label":[{"text":"ops"}],"type":"local","username":"bob","password":"pw","isValid":false,"errors":{}}"#;
/// let account: Account = serde_json::from_str(json)?;
/// assert_eq!(account.id, 3);
/// assert_eq!(account.kind, AccountType::Local);
/// assert_eq!(account.label[0].text, "ops");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Store-assigned identifier. Unique and never reused within a store.
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub label: Vec<LabelTag>,

    #[serde(rename = "type")]
    pub kind: AccountType,

    pub username: String,

    /// Always `None` for [`AccountType::Ldap`].
    #[serde(default)]
    pub password: Option<String>,

    /// Cached result of the last validation. Stale after any mutation.
    #[serde(default)]
    pub is_valid: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: AccountErrors,
}

impl Account {
    /// Total number of characters across all label tags.
    ///
    /// This is the length the label rule compares against
    /// [`LABEL_MAX_LEN`](crate::account_validation::LABEL_MAX_LEN).
    pub fn label_len(&self) -> usize {
        self.label.iter().map(|tag| tag.text.chars().count()).sum()
    }

    pub fn is_ldap(&self) -> bool {
        self.kind == AccountType::Ldap
    }
}

/// Candidate record accepted by `add_account`.
///
/// Carries no `id`, `isValid` or `errors`: the store assigns those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub label: Option<Vec<LabelTag>>,
    #[serde(rename = "type")]
    pub kind: AccountType,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl NewAccount {
    pub fn ldap(username: impl Into<String>) -> Self {
        Self {
            label: None,
            kind: AccountType::Ldap,
            username: username.into(),
            password: None,
        }
    }

    pub fn local(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            label: None,
            kind: AccountType::Local,
            username: username.into(),
            password: Some(password.into()),
        }
    }

    pub fn with_label<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label = Some(tags.into_iter().map(LabelTag::new).collect());
        self
    }
}

/// Partial overwrite applied by `update_account`.
///
/// `None` leaves a field untouched. `password` is doubly optional so that
/// `Some(None)` (JSON `"password": null`) clears the stored password while an
/// absent key leaves it alone. The identifier is deliberately not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Vec<LabelTag>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<AccountErrors>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        *self == AccountPatch::default()
    }

    /// Overwrites exactly the supplied fields on `account`.
    pub(crate) fn apply_to(self, account: &mut Account) {
        if let Some(label) = self.label {
            account.label = label;
        }
        if let Some(kind) = self.kind {
            account.kind = kind;
        }
        if let Some(username) = self.username {
            account.username = username;
        }
        if let Some(password) = self.password {
            account.password = password;
        }
        if let Some(is_valid) = self.is_valid {
            account.is_valid = is_valid;
        }
        if let Some(errors) = self.errors {
            account.errors = errors;
        }
    }
}

/// The persisted shape of the store: exactly these three fields are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsState {
    /// Records in insertion order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: Vec<Account>,

    /// A missing or null counter decodes as `0`, which `initialize` repairs.
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_id: u64,

    #[serde(default = "current_version")]
    pub version: u32,
}

impl Default for AccountsState {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            next_id: FIRST_ID,
            version: CURRENT_VERSION,
        }
    }
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
