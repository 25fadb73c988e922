//! # Account Store Core
//!
//! A local account record store designed for FFI (Foreign Function Interface)
//! integration with UI hosts. It keeps LDAP and local credential records in
//! memory, validates them field by field, and persists the whole record set
//! as one JSON blob in LMDB.
//!
//! ## Features
//!
//! - **Store-assigned ids**: monotonically increasing, never reused
//! - **Field validation**: username, password and label rules with messages
//!   attached to each record
//! - **Explicit persistence**: an [`AccountRepository`](repository::AccountRepository)
//!   loaded once and saved after every mutation
//! - **Lenient by design**: unknown ids and unreadable blobs never panic
//!
//! ## Quick Start
//!
//! ```rust
//! use account_store_core::account_model::NewAccount;
//! use account_store_core::blob_store::MemoryBlobStore;
//! use account_store_core::config::StoreConfig;
//! use account_store_core::repository::BlobAccountRepository;
//! use account_store_core::session::AccountSession;
//!
//! let repository = BlobAccountRepository::new(MemoryBlobStore::new());
//! let mut session = AccountSession::open(repository, StoreConfig::default());
//!
//! let id = session.add_account(NewAccount::ldap("alice")).unwrap();
//! assert!(session.validate_account(id));
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_account_store`] - Open a session backed by `{name}.lmdb`
//! - [`create_account_store_with_config`] - Same, with a JSON [`config::StoreConfig`]
//! - [`add_account`] - Append a record, returns it with its id
//! - [`update_account`] - Overwrite fields of a record
//! - [`remove_account`] - Delete a record
//! - [`validate_account`] - Run the field rules on a record
//! - [`clear_accounts`] - Delete every record and reset ids
//! - [`initialize_accounts`] - Repair a damaged state
//! - [`get_accounts`] - The persisted state as JSON
//! - [`get_account_by_id`] - One record as JSON
//! - [`close_account_store`] - Release the session
//! - [`free_response`] - Release a string returned by any of the above
//!
//! Every function except `create_*` returns a JSON-encoded [`app_response::AppResponse`].

pub mod account_model;
pub mod account_store;
pub mod account_validation;
pub mod app_response;
pub mod blob_store;
pub mod config;
pub mod repository;
pub mod session;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde_json::json;

use crate::account_model::{AccountPatch, NewAccount};
use crate::app_response::AppResponse;
use crate::config::StoreConfig;
use crate::repository::serialize_state;
use crate::session::LmdbAccountSession;

/// Opens an account store persisted in the LMDB environment `{name}.lmdb`.
///
/// The persisted state is loaded immediately; a missing or unreadable state
/// yields an empty store.
///
/// # Returns
///
/// A session pointer on success, or null if `name` is null, not UTF-8, or the
/// environment cannot be opened. Release it with [`close_account_store`].
///
/// # Safety
///
/// `name` must be null or a valid null-terminated C string.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use account_store_core::{create_account_store, close_account_store, free_response};
///
/// let name = CString::new("accounts").unwrap();
/// let session = create_account_store(name.as_ptr());
/// if !session.is_null() {
///     free_response(close_account_store(session));
/// }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_account_store(name: *const c_char) -> *mut LmdbAccountSession {
    open_session(name, StoreConfig::default())
}

/// Like [`create_account_store`], with a JSON-encoded [`StoreConfig`].
///
/// Keys missing from `config_json` take their default. Returns null if the
/// config cannot be parsed.
///
/// # Safety
///
/// `name` and `config_json` must each be null or a valid null-terminated C string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_account_store_with_config(
    name: *const c_char,
    config_json: *const c_char,
) -> *mut LmdbAccountSession {
    let config_str = match c_ptr_to_str(config_json) {
        Some(s) => s,
        None => {
            warn!("Null or invalid config pointer passed to create_account_store_with_config");
            return std::ptr::null_mut();
        }
    };

    match StoreConfig::from_json(config_str) {
        Ok(config) => open_session(name, config),
        Err(e) => {
            warn!("Rejected store config: {e}");
            std::ptr::null_mut()
        }
    }
}

fn open_session(name: *const c_char, config: StoreConfig) -> *mut LmdbAccountSession {
    let name_str = match c_ptr_to_str(name) {
        Some(s) => s,
        None => {
            warn!("Null or invalid name pointer passed to create_account_store");
            return std::ptr::null_mut();
        }
    };

    match LmdbAccountSession::open_lmdb(name_str, config) {
        Ok(session) => {
            info!("Account store '{}' ready", name_str);
            Box::into_raw(Box::new(session))
        }
        Err(e) => {
            warn!("Failed to open account store '{}': {}", name_str, e);
            std::ptr::null_mut()
        }
    }
}

/// Appends a new account.
///
/// # JSON Format
///
/// ```json
/// {
///   "type": "local",
///   "username": "bob",
///   "password": "secret",
///   "label": [{ "text": "ops" }]
/// }
/// ```
///
/// `label` and `password` may be omitted or null. The response carries the
/// stored record, including its assigned `id`.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_account(session: *mut LmdbAccountSession, json_ptr: *const c_char) -> *const c_char {
    let session = match session_mut(session, "add_account") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let draft: NewAccount = match serde_json::from_str(&json_str) {
        Ok(d) => d,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid account JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match session.add_account(draft) {
        Some(id) => json_response(&session.get(id)),
        None => {
            let error = AppResponse::ValidationError("Account id space exhausted".to_string());
            response_to_c_string(&error)
        }
    }
}

/// Overwrites the fields present in `json_ptr` on the account with `id`.
///
/// An unknown id is not an error; the response then carries `null`.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_account(
    session: *mut LmdbAccountSession,
    id: u64,
    json_ptr: *const c_char,
) -> *const c_char {
    let session = match session_mut(session, "update_account") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let patch: AccountPatch = match serde_json::from_str(&json_str) {
        Ok(p) => p,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid update JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    session.update_account(id, patch);
    json_response(&session.get(id))
}

/// Deletes the account with `id`. An unknown id is not an error.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn remove_account(session: *mut LmdbAccountSession, id: u64) -> *const c_char {
    let session = match session_mut(session, "remove_account") {
        Ok(s) => s,
        Err(err) => return err,
    };

    session.remove_account(id);
    response_to_c_string(&AppResponse::success(format!("Account {id} removed")))
}

/// Validates the account with `id`.
///
/// The response is `{"valid": bool, "account": <record or null>}`.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn validate_account(session: *mut LmdbAccountSession, id: u64) -> *const c_char {
    let session = match session_mut(session, "validate_account") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let valid = session.validate_account(id);
    json_response(&json!({ "valid": valid, "account": session.get(id) }))
}

/// Deletes every account and resets the id counter to 1.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_accounts(session: *mut LmdbAccountSession) -> *const c_char {
    let session = match session_mut(session, "clear_accounts") {
        Ok(s) => s,
        Err(err) => return err,
    };

    session.clear_accounts();
    response_to_c_string(&AppResponse::success("All accounts cleared"))
}

/// Repairs a damaged state. The response is `true` if anything changed.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn initialize_accounts(session: *mut LmdbAccountSession) -> *const c_char {
    let session = match session_mut(session, "initialize_accounts") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let repaired = session.initialize();
    json_response(&repaired)
}

/// Returns `{"accounts": [...], "nextId": n, "version": v}`.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_accounts(session: *mut LmdbAccountSession) -> *const c_char {
    let session = match session_mut(session, "get_accounts") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match serialize_state(session.store().state()) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Returns the account with `id`, or `NotFound`.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not been passed to [`close_account_store`]. Pointer arguments
/// holding JSON must be null or valid null-terminated C strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_account_by_id(session: *mut LmdbAccountSession, id: u64) -> *const c_char {
    let session = match session_mut(session, "get_account_by_id") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match session.get(id) {
        Some(account) => json_response(account),
        None => {
            let error = AppResponse::NotFound(format!("No account found with id: {id}"));
            response_to_c_string(&error)
        }
    }
}

/// Releases a session created by [`create_account_store`].
///
/// The state is flushed once more before the LMDB environment is closed. The
/// pointer must not be used afterwards.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`create_account_store`]
/// that has not already been closed. Ownership is taken back with
/// `Box::from_raw`, so closing the same pointer twice is a double free.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_account_store(session: *mut LmdbAccountSession) -> *const c_char {
    if session.is_null() {
        let error = AppResponse::BadRequest("Null session pointer passed to close_account_store".to_string());
        return response_to_c_string(&error);
    }

    let session = unsafe { Box::from_raw(session) };
    let flushed = session.flush();
    drop(session);

    match flushed {
        Ok(()) => response_to_c_string(&AppResponse::success("Account store closed")),
        Err(e) => {
            warn!("Final flush failed while closing account store: {e}");
            response_to_c_string(&e)
        }
    }
}

/// Releases a string returned by any function of this library. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a response returned by this library that has not
/// been freed yet. Passing any other pointer is undefined behavior.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

/// Borrows the session behind an FFI handle.
///
/// # Safety
///
/// `session` must be null or point to a live session created by
/// [`create_account_store`]; the returned borrow must not outlive the call
/// that produced it.
fn session_mut<'a>(
    session: *mut LmdbAccountSession,
    caller: &str,
) -> Result<&'a mut LmdbAccountSession, *const c_char> {
    match unsafe { session.as_mut() } {
        Some(s) => Ok(s),
        None => {
            warn!("Null session pointer passed to {caller}");
            let error = AppResponse::BadRequest(format!("Null session pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// Wraps `value` as JSON in an [`AppResponse::Ok`].
fn json_response<T: serde::Serialize + ?Sized>(value: &T) -> *const c_char {
    match serde_json::to_string(value) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Serializes `response` to a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust `String`.
///
/// On failure the `Err` holds a ready-made `BadRequest` response naming
/// `field_name`.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn c_ptr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok() }
}
