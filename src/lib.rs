//! # Acad Guide Core
//!
//! Offline record store for an academic guidance portal: departments,
//! courses, lessons, events, flashcard sets and quizzes, with an update log,
//! generated notifications, bookmarks and per-student progress. Built on LMDB
//! and exposed both as a Rust API ([`AcadStore`]) and through C-compatible
//! functions for embedding in a UI shell.
//!
//! ## Features
//!
//! - **LMDB-based storage**: one named database per collection, one write
//!   transaction per mutation
//! - **Update log and notifications**: every catalog change is recorded in the
//!   same transaction as the change itself
//! - **Change listeners**: in-process subscriptions to mutations and notifications
//! - **Memory fallback**: a session keeps working when the on-disk store cannot open
//! - **Safe error handling**: No `unwrap()` calls in production code
//!
//! ## Quick Start
//!
//! ```no_run
//! use acad_guide_core::{create_store, add_item, free_response};
//! use std::ffi::CString;
//!
//! let config = CString::new(r#"{"path":"acad_guide"}"#).unwrap();
//! let store = create_store(config.as_ptr());
//!
//! let collection = CString::new("lessons").unwrap();
//! let lesson = CString::new(r#"{"id":"L1","courseId":"C1","title":"Intro","content":"..."}"#).unwrap();
//! let response = add_item(store, collection.as_ptr(), lesson.as_ptr());
//! free_response(response);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_store`] / [`close_store`] - Open and release a store handle
//! - [`get_data`], [`store_data`], [`add_item`], [`update_item`], [`delete_item`], [`get_item_by_id`] - Collection access
//! - [`get_notifications`], [`mark_notification_as_read`], [`dismiss_notification`] - Notifications
//! - [`get_recent_updates`], [`mark_update_as_read`] - Recent-updates feed
//! - [`subscribe_to_updates`], [`subscribe_to_notifications`] and their `unsubscribe_from_*` pairs - Listeners
//! - [`get_bookmarks`], [`add_bookmark`], [`remove_bookmark`], [`is_bookmarked`] - Bookmarks
//! - [`get_user`], [`store_user`], [`logout_user`] - Session user
//! - [`search_data`], [`seed_data`], [`clear_all_records`], [`reset_database`] - Catalog maintenance
//! - [`free_response`] - Release any string returned by this library

pub mod acad_store;
pub mod app_response;
pub mod bookmarks;
pub mod collection;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod local_db_model;
pub mod local_db_state;
pub mod local_storage;
pub mod progress;
pub mod search;
pub mod seed;
pub mod session;
pub mod update_recorder;
mod lmdb_backend;
mod memory_backend;

pub use crate::acad_store::AcadStore;
pub use crate::collection::{Collection, RecordId};
pub use crate::config::StoreConfig;
pub use crate::error::StoreError;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::bookmarks::BookmarkKind;
use crate::event_bus::ListenerKey;
use crate::seed::SeedData;
use crate::session::SessionUser;

/// Listener invoked with a null-terminated JSON payload. The pointer is only
/// valid for the duration of the call.
pub type JsonCallback = extern "C" fn(*const c_char);

/// Opens a store from a JSON [`StoreConfig`].
///
/// # Parameters
///
/// * `config_json` - Null-terminated C string with the configuration, e.g.
///   `{"path":"acad_guide","map_size_mb":64}`. Missing fields take their defaults.
///
/// # Returns
///
/// Returns a pointer to the [`AcadStore`] on success, or a null pointer on failure.
/// Release it with [`close_store`].
///
/// # Errors
///
/// Returns null pointer if:
/// - The config pointer is null or not valid UTF-8
/// - The config is not valid JSON or fails validation
/// - The store cannot open and memory fallback is disabled
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(config_json: *const c_char) -> *mut AcadStore {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let raw = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    let config = match StoreConfig::from_json(raw) {
        Ok(config) => config,
        Err(e) => {
            warn!("Rejected store config: {e}");
            return std::ptr::null_mut();
        }
    };

    info!("Opening store at: {}", config.lmdb_dir().display());
    match AcadStore::open(config) {
        Ok(store) => {
            info!("Store ready ({:?} backend)", store.backend_kind());
            Box::into_raw(Box::new(store))
        }
        Err(e) => {
            warn!("Failed to open store: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Closes the store and frees the handle. The pointer must not be used
/// afterwards, even when the returned envelope reports an error.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(store: *mut AcadStore) -> *const c_char {
    if store.is_null() {
        let error = AppResponse::BadRequest("Null store pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    let store = unsafe { Box::from_raw(store) };
    let response = match store.close() {
        Ok(()) => AppResponse::success("Store closed successfully"),
        Err(e) => AppResponse::from(e),
    };
    drop(store);
    response_to_c_string(&response)
}

/// Releases a string returned by any function of this library. Null is ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(response: *const c_char) {
    if response.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(response as *mut c_char) });
}

/// Returns every record of a collection as a JSON array.
///
/// # Parameters
///
/// * `store` - Store handle from [`create_store`]
/// * `collection` - Collection name, e.g. `"lessons"`
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use acad_guide_core::{create_store, get_data};
///
/// let config = CString::new("{}").unwrap();
/// let store = create_store(config.as_ptr());
///
/// let collection = CString::new("events").unwrap();
/// let events = get_data(store, collection.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_data(store: *mut AcadStore, collection: *const c_char) -> *const c_char {
    let store = match store_ref(store, "get_data") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let collection = match c_ptr_to_collection(collection) {
        Ok(collection) => collection,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.get_all(collection)))
}

/// Replaces a collection with the records of a JSON array.
///
/// Nothing is written when any record is invalid or two records share an id.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn store_data(
    store: *mut AcadStore,
    collection: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "store_data") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let collection = match c_ptr_to_collection(collection) {
        Ok(collection) => collection,
        Err(error_ptr) => return error_ptr,
    };
    let records: Vec<JsonValue> = match c_ptr_to_json(json_ptr, "JSON") {
        Ok(records) => records,
        Err(error_ptr) => return error_ptr,
    };

    let count = records.len();
    let response = match store.replace_all(collection, records) {
        Ok(()) => AppResponse::success(format!("Stored {count} records in {collection}")),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Inserts a new record.
///
/// # Returns
///
/// Returns the stored record (with its assigned id for `notifications` and
/// `updates`) in an `Ok` envelope, or `Conflict` when the id already exists.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use acad_guide_core::{create_store, add_item};
///
/// let config = CString::new("{}").unwrap();
/// let store = create_store(config.as_ptr());
///
/// let collection = CString::new("events").unwrap();
/// let event = CString::new(r#"{"id":"E1","title":"Career Fair","date":"2025-03-01"}"#).unwrap();
/// let result = add_item(store, collection.as_ptr(), event.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_item(
    store: *mut AcadStore,
    collection: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "add_item") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let collection = match c_ptr_to_collection(collection) {
        Ok(collection) => collection,
        Err(error_ptr) => return error_ptr,
    };
    let record = match c_ptr_to_json(json_ptr, "JSON") {
        Ok(record) => record,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.insert(collection, record)))
}

/// Inserts or overwrites the record carrying the same id.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_item(
    store: *mut AcadStore,
    collection: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "update_item") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let collection = match c_ptr_to_collection(collection) {
        Ok(collection) => collection,
        Err(error_ptr) => return error_ptr,
    };
    let record = match c_ptr_to_json(json_ptr, "JSON") {
        Ok(record) => record,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.update(collection, record)))
}

/// Deletes a record by id. Answers `Ok("true")` when a record was removed and
/// `Ok("false")` when there was none.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_item(store: *mut AcadStore, collection: *const c_char, id: *const c_char) -> *const c_char {
    let store = match store_ref(store, "delete_item") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let (collection, id) = match c_ptr_to_record_id(collection, id) {
        Ok(parsed) => parsed,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.remove(collection, &id)))
}

/// Retrieves one record by id, answering `NotFound` when it does not exist.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_item_by_id(
    store: *mut AcadStore,
    collection: *const c_char,
    id: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "get_item_by_id") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let (collection, id) = match c_ptr_to_record_id(collection, id) {
        Ok(parsed) => parsed,
        Err(error_ptr) => return error_ptr,
    };

    let response = match store.get_by_id(collection, &id) {
        Ok(Some(record)) => AppResponse::json(&record),
        Ok(None) => AppResponse::NotFound(format!("No record in {collection} with id: {id}")),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Case-insensitive search over departments, courses, lessons and events.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn search_data(store: *mut AcadStore, query: *const c_char) -> *const c_char {
    let store = match store_ref(store, "search_data") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let query = match c_ptr_to_string(query, "query") {
        Ok(query) => query,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.search(&query)))
}

/// Lists every notification, read or not.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
///
/// # Returns
///
/// Returns a JSON array of notifications in an `Ok` envelope.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_notifications(store: *mut AcadStore) -> *const c_char {
    match store_ref(store, "get_notifications") {
        Ok(store) => response_to_c_string(&AppResponse::from_result(store.notifications())),
        Err(error_ptr) => error_ptr,
    }
}

/// Flags notification `id` as read. The notification is kept.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
/// * `id` - Numeric id of the notification.
///
/// # Returns
///
/// Returns `Ok("true")`, or `Ok("false")` when no such notification exists.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mark_notification_as_read(store: *mut AcadStore, id: u64) -> *const c_char {
    match store_ref(store, "mark_notification_as_read") {
        Ok(store) => response_to_c_string(&AppResponse::from_result(store.mark_notification_as_read(id))),
        Err(error_ptr) => error_ptr,
    }
}

/// Deletes notification `id`.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
/// * `id` - Numeric id of the notification.
///
/// # Returns
///
/// Returns `Ok("true")` when a notification was deleted, otherwise `Ok("false")`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn dismiss_notification(store: *mut AcadStore, id: u64) -> *const c_char {
    match store_ref(store, "dismiss_notification") {
        Ok(store) => response_to_c_string(&AppResponse::from_result(store.dismiss_notification(id))),
        Err(error_ptr) => error_ptr,
    }
}

/// Lists the newest update-log entries, newest first.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
///
/// # Returns
///
/// Returns at most `recent_updates_limit` entries as a JSON array in an
/// `Ok` envelope.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_recent_updates(store: *mut AcadStore) -> *const c_char {
    match store_ref(store, "get_recent_updates") {
        Ok(store) => response_to_c_string(&AppResponse::from_result(store.recent_updates())),
        Err(error_ptr) => error_ptr,
    }
}

/// Acknowledges an update; its log entry is deleted.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mark_update_as_read(store: *mut AcadStore, id: u64) -> *const c_char {
    match store_ref(store, "mark_update_as_read") {
        Ok(store) => response_to_c_string(&AppResponse::from_result(store.mark_update_as_read(id))),
        Err(error_ptr) => error_ptr,
    }
}

/// Registers `callback` for every logged mutation. The payload is a
/// [`MutationEvent`](crate::event_bus::MutationEvent) as JSON.
///
/// # Returns
///
/// Returns the listener key in an `Ok` envelope; pass it to
/// [`unsubscribe_from_updates`] to stop delivery.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn subscribe_to_updates(store: *mut AcadStore, callback: Option<JsonCallback>) -> *const c_char {
    let store = match store_ref(store, "subscribe_to_updates") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let Some(callback) = callback else {
        return response_to_c_string(&AppResponse::BadRequest("Null callback passed to subscribe_to_updates".to_string()));
    };

    let key = store.subscribe_to_updates(move |event| deliver(callback, event)).detach();
    response_to_c_string(&AppResponse::json(&key.to_raw()))
}

/// Registers `callback` for every new notification. The payload is a
/// [`NotificationEvent`](crate::event_bus::NotificationEvent) as JSON.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn subscribe_to_notifications(store: *mut AcadStore, callback: Option<JsonCallback>) -> *const c_char {
    let store = match store_ref(store, "subscribe_to_notifications") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let Some(callback) = callback else {
        return response_to_c_string(&AppResponse::BadRequest(
            "Null callback passed to subscribe_to_notifications".to_string(),
        ));
    };

    let key = store.subscribe_to_notifications(move |event| deliver(callback, event)).detach();
    response_to_c_string(&AppResponse::json(&key.to_raw()))
}

/// Releases a key returned by [`subscribe_to_updates`].
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
/// * `key` - Listener key from the subscribe call.
///
/// # Returns
///
/// Returns `Ok("true")` when the listener was registered, otherwise `Ok("false")`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn unsubscribe_from_updates(store: *mut AcadStore, key: u64) -> *const c_char {
    match store_ref(store, "unsubscribe_from_updates") {
        Ok(store) => {
            let removed = store.events().unsubscribe_from_updates(ListenerKey::from_raw(key));
            response_to_c_string(&AppResponse::json(&removed))
        }
        Err(error_ptr) => error_ptr,
    }
}

/// Releases a key returned by [`subscribe_to_notifications`].
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
/// * `key` - Listener key from the subscribe call.
///
/// # Returns
///
/// Same as [`unsubscribe_from_updates`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn unsubscribe_from_notifications(store: *mut AcadStore, key: u64) -> *const c_char {
    match store_ref(store, "unsubscribe_from_notifications") {
        Ok(store) => {
            let removed = store.events().unsubscribe_from_notifications(ListenerKey::from_raw(key));
            response_to_c_string(&AppResponse::json(&removed))
        }
        Err(error_ptr) => error_ptr,
    }
}

/// Lists saved bookmarks in the order they were added.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
///
/// # Returns
///
/// Returns a JSON array of `{id, type, title, timestamp}` objects in an
/// `Ok` envelope.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_bookmarks(store: *mut AcadStore) -> *const c_char {
    match store_ref(store, "get_bookmarks") {
        Ok(store) => response_to_c_string(&AppResponse::from_result(store.bookmarks().list())),
        Err(error_ptr) => error_ptr,
    }
}

/// Saves a bookmark. `kind` is one of `lesson`, `event`, `flashcard`, `quiz`.
/// Answers `Ok("false")` when the bookmark already exists.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_bookmark(
    store: *mut AcadStore,
    id: *const c_char,
    kind: *const c_char,
    title: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "add_bookmark") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let (id, kind) = match c_ptr_to_bookmark(id, kind) {
        Ok(parsed) => parsed,
        Err(error_ptr) => return error_ptr,
    };
    let title = match c_ptr_to_string(title, "title") {
        Ok(title) => title,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.bookmarks().add(&id, kind, &title)))
}

/// Removes the bookmark matching `id` and `kind`.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
/// * `id` - Id of the bookmarked record.
/// * `kind` - One of `lesson`, `event`, `flashcard`, `quiz`.
///
/// # Returns
///
/// Returns `Ok("true")` when a bookmark was removed, otherwise `Ok("false")`.
/// An unknown `kind` yields `ValidationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn remove_bookmark(store: *mut AcadStore, id: *const c_char, kind: *const c_char) -> *const c_char {
    let store = match store_ref(store, "remove_bookmark") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let (id, kind) = match c_ptr_to_bookmark(id, kind) {
        Ok(parsed) => parsed,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.bookmarks().remove(&id, kind)))
}

/// Checks for a bookmark on `id` of the given `kind`.
///
/// # Parameters
///
/// Same as [`remove_bookmark`].
///
/// # Returns
///
/// Returns `Ok("true")` or `Ok("false")`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn is_bookmarked(store: *mut AcadStore, id: *const c_char, kind: *const c_char) -> *const c_char {
    let store = match store_ref(store, "is_bookmarked") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let (id, kind) = match c_ptr_to_bookmark(id, kind) {
        Ok(parsed) => parsed,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.bookmarks().has(&id, kind)))
}

/// Returns the signed-in user, or `Ok("null")` when nobody is signed in.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_user(store: *mut AcadStore) -> *const c_char {
    let store = match store_ref(store, "get_user") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };

    let response = match store.load_session() {
        Ok(session) => AppResponse::json(&session.current_user()),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Signs a user in, replacing any current user.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
/// * `json_ptr` - User object as JSON with `id`, `username`, `role`, `name`
///   and `department`.
///
/// # Returns
///
/// Returns `Ok` on success, or `SerializationError` when the JSON is not a user.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn store_user(store: *mut AcadStore, json_ptr: *const c_char) -> *const c_char {
    let store = match store_ref(store, "store_user") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let user: SessionUser = match c_ptr_to_json(json_ptr, "user") {
        Ok(user) => user,
        Err(error_ptr) => return error_ptr,
    };

    let response = match store.load_session().and_then(|mut session| session.login(user)) {
        Ok(()) => AppResponse::success("User stored"),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Signs the current user out. The theme preference is kept.
///
/// # Parameters
///
/// * `store` - Handle returned by [`create_store`].
///
/// # Returns
///
/// Returns `Ok` even when nobody was signed in.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn logout_user(store: *mut AcadStore) -> *const c_char {
    let store = match store_ref(store, "logout_user") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };

    let response = match store.load_session().and_then(|mut session| session.logout()) {
        Ok(()) => AppResponse::success("User signed out"),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Imports a [`SeedData`] document unless the store was already seeded.
/// Answers `Ok("true")` when the import ran.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn seed_data(store: *mut AcadStore, json_ptr: *const c_char) -> *const c_char {
    let store = match store_ref(store, "seed_data") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };
    let seed: SeedData = match c_ptr_to_json(json_ptr, "seed") {
        Ok(seed) => seed,
        Err(error_ptr) => return error_ptr,
    };

    response_to_c_string(&AppResponse::from_result(store.seed_once(seed)))
}

/// Empties every collection, keeping bookmarks, session and progress.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_all_records(store: *mut AcadStore) -> *const c_char {
    let store = match store_ref(store, "clear_all_records") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };

    let response = match store.clear_all_records() {
        Ok(cleared) => AppResponse::success(format!("Cleared {cleared} records")),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// Drops all records, id sequences and local storage.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn reset_database(store: *mut AcadStore) -> *const c_char {
    let store = match store_ref(store, "reset_database") {
        Ok(store) => store,
        Err(error_ptr) => return error_ptr,
    };

    let response = match store.reset_database() {
        Ok(()) => AppResponse::success("Database was reset successfully"),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

fn deliver<E: Serialize>(callback: JsonCallback, event: &E) {
    let payload = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!("Error serializing event: {e}");
            return;
        }
    };
    match CString::new(payload) {
        Ok(c_str) => callback(c_str.as_ptr()),
        Err(e) => warn!("Error creating CString for event: {e}"),
    }
}

/// Converts an [`AppResponse`] to a C string owned by the caller, to be
/// released with [`free_response`].
///
/// Returns a null pointer if serialization or C string creation fails.
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

fn store_ref<'a>(store: *mut AcadStore, caller: &str) -> Result<&'a AcadStore, *const c_char> {
    match unsafe { store.as_ref() } {
        Some(store) => Ok(store),
        None => {
            let error = AppResponse::BadRequest(format!("Null store pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// Converts a C string pointer to a Rust String.
///
/// # Returns
///
/// * `Ok(String)` - If conversion was successful
/// * `Err(*const c_char)` - A `BadRequest` envelope for a null pointer or invalid UTF-8
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        warn!("Null {field_name} pointer");
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            warn!("Invalid UTF-8 in {field_name}: {e}");
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn c_ptr_to_json<T: serde::de::DeserializeOwned>(ptr: *const c_char, field_name: &str) -> Result<T, *const c_char> {
    let raw = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&raw).map_err(|e| {
        let error = AppResponse::SerializationError(format!("Invalid {field_name}: {e}"));
        response_to_c_string(&error)
    })
}

fn c_ptr_to_collection(ptr: *const c_char) -> Result<Collection, *const c_char> {
    let name = c_ptr_to_string(ptr, "collection")?;
    name.parse::<Collection>().map_err(|e| response_to_c_string(&AppResponse::from(e)))
}

fn c_ptr_to_record_id(collection: *const c_char, id: *const c_char) -> Result<(Collection, RecordId), *const c_char> {
    let collection = c_ptr_to_collection(collection)?;
    let raw = c_ptr_to_string(id, "id")?;
    let id = RecordId::parse(collection, &raw).map_err(|e| response_to_c_string(&AppResponse::from(e)))?;
    Ok((collection, id))
}

fn c_ptr_to_bookmark(id: *const c_char, kind: *const c_char) -> Result<(String, BookmarkKind), *const c_char> {
    let id = c_ptr_to_string(id, "id")?;
    let kind = c_ptr_to_string(kind, "kind")?
        .parse::<BookmarkKind>()
        .map_err(|e| response_to_c_string(&AppResponse::from(e)))?;
    Ok((id, kind))
}
