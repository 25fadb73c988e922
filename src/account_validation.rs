//! Field rules applied by `validate_account`.
//!
//! Rules run in a fixed order: username, password (local accounts only),
//! label. Each rule yields at most one message. The label rule's message lands
//! in the slot chosen by [`LabelErrorPlacement`]; with the default
//! `UsernameSlot` it replaces whatever the username rule wrote.

use crate::account_model::{Account, AccountErrors, AccountType};
use crate::config::LabelErrorPlacement;

pub const USERNAME_MAX_LEN: usize = 100;
pub const PASSWORD_MAX_LEN: usize = 100;
pub const LABEL_MAX_LEN: usize = 50;

pub const USERNAME_REQUIRED: &str = "Username is required";
pub const USERNAME_TOO_LONG: &str = "Username must be max 100 characters";
pub const PASSWORD_REQUIRED: &str = "Password is required for local accounts";
pub const PASSWORD_TOO_LONG: &str = "Password must be max 100 characters";
pub const LABEL_TOO_LONG: &str = "Label must be max 50 characters";

/// Result of running every rule against one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub errors: AccountErrors,
    pub is_valid: bool,
}

pub fn validate(account: &Account, placement: LabelErrorPlacement) -> Validation {
    let mut errors = AccountErrors::default();
    let mut failed = false;

    if let Some(msg) = check_username(&account.username) {
        errors.username = Some(msg.to_string());
        failed = true;
    }

    if account.kind == AccountType::Local {
        if let Some(msg) = check_password(account.password.as_deref()) {
            errors.password = Some(msg.to_string());
            failed = true;
        }
    }

    if account.label_len() > LABEL_MAX_LEN {
        let slot = match placement {
            LabelErrorPlacement::UsernameSlot => &mut errors.username,
            LabelErrorPlacement::LabelSlot => &mut errors.label,
        };
        *slot = Some(LABEL_TOO_LONG.to_string());
        failed = true;
    }

    Validation {
        errors,
        is_valid: !failed,
    }
}

fn check_username(username: &str) -> Option<&'static str> {
    if username.trim().is_empty() {
        Some(USERNAME_REQUIRED)
    } else if username.chars().count() > USERNAME_MAX_LEN {
        Some(USERNAME_TOO_LONG)
    } else {
        None
    }
}

// A missing password counts as empty.
fn check_password(password: Option<&str>) -> Option<&'static str> {
    let password = password.unwrap_or_default();
    if password.trim().is_empty() {
        Some(PASSWORD_REQUIRED)
    } else if password.chars().count() > PASSWORD_MAX_LEN {
        Some(PASSWORD_TOO_LONG)
    } else {
        None
    }
}
