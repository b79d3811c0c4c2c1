//! Collection access API.
//!
//! [`AcadStore`] is the entry point for everything the portal reads and
//! writes. Each mutation runs in one transaction that also appends its
//! update-log entry and, for user-facing collections, its notification.
//! Listeners are told after the commit.
//!
//! ```rust
//! use acad_guide_core::acad_store::AcadStore;
//! use acad_guide_core::collection::{Collection, RecordId};
//! use serde_json::json;
//!
//! let store = AcadStore::in_memory();
//! store.insert(Collection::Lessons, json!({
//!     "id": "L1",
//!     "courseId": "course-1",
//!     "title": "T",
//!     "content": "C"
//! }))?;
//!
//! let lesson = store.get_by_id(Collection::Lessons, &RecordId::text("L1")?)?;
//! assert!(lesson.is_some());
//! assert_eq!(store.notifications()?[0].title, "New Lesson Available");
//! assert_eq!(store.recent_updates()?[0].title, "New Lesson: T");
//! # Ok::<(), acad_guide_core::error::StoreError>(())
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::{json, Value as JsonValue};

use crate::bookmarks::BookmarkStore;
use crate::collection::{Collection, RecordId};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::event_bus::{EventBus, MutationEvent, NotificationEvent, Subscription};
use crate::local_db_model::{validate_record, CollectionRecord, Notification, RecentUpdate, UpdateAction, UpdateEntry};
use crate::local_db_state::{AppDbState, BackendKind, WriteTxn};
use crate::local_storage::LocalStorage;
use crate::progress::ProgressTracker;
use crate::session::SessionContext;
use crate::update_recorder::{self, now_timestamp};

/// What a committed mutation produced for the log and the listeners.
struct Recorded {
    entry: UpdateEntry,
    notification: Option<Notification>,
}

pub struct AcadStore {
    db: Arc<AppDbState>,
    bus: EventBus,
    config: StoreConfig,
}

impl AcadStore {
    /// Opens the store. When LMDB is unavailable and
    /// [`StoreConfig::fallback_to_memory`] is set, the session continues on
    /// the in-memory backend.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let db = match AppDbState::init(&config) {
            Ok(db) => db,
            Err(StoreError::StoreUnavailable(reason)) if config.fallback_to_memory => {
                warn!("Record store unavailable ({reason}); continuing in memory");
                AppDbState::in_memory()
            }
            Err(e) => {
                error!("Failed to open record store: {e}");
                return Err(e);
            }
        };
        Ok(AcadStore {
            db: Arc::new(db),
            bus: EventBus::new(),
            config,
        })
    }

    pub fn in_memory() -> Self {
        AcadStore {
            db: Arc::new(AppDbState::in_memory()),
            bus: EventBus::new(),
            config: StoreConfig::memory(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.db.backend_kind()
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn local_storage(&self) -> LocalStorage {
        LocalStorage::new(self.db.clone())
    }

    pub fn bookmarks(&self) -> BookmarkStore {
        BookmarkStore::new(self.local_storage())
    }

    pub fn progress(&self) -> ProgressTracker {
        ProgressTracker::new(self.local_storage())
    }

    pub fn load_session(&self) -> Result<SessionContext, StoreError> {
        SessionContext::load(self.local_storage())
    }

    /// Every record of `collection`, in key order.
    pub fn get_all(&self, collection: Collection) -> Result<Vec<JsonValue>, StoreError> {
        self.db.get(collection)
    }

    pub fn get_by_id(&self, collection: Collection, id: &RecordId) -> Result<Option<JsonValue>, StoreError> {
        self.db.get_by_id(collection, id)
    }

    /// Every record of `T`'s collection, typed.
    pub fn list<T: CollectionRecord>(&self) -> Result<Vec<T>, StoreError> {
        self.get_all(T::COLLECTION)?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(StoreError::from))
            .collect()
    }

    pub fn find<T: CollectionRecord>(&self, id: &RecordId) -> Result<Option<T>, StoreError> {
        self.get_by_id(T::COLLECTION, id)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Replaces the whole collection with `records`.
    ///
    /// Every record is validated and ids must be unique within `records`;
    /// otherwise nothing is written. User-facing collections log one `bulk`
    /// entry and never notify.
    pub fn replace_all(&self, collection: Collection, records: Vec<JsonValue>) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let id = validate_record(collection, &record)?;
            if let Some(id) = &id {
                if !seen.insert(id.clone()) {
                    return Err(StoreError::validation(format!(
                        "Duplicate id '{id}' in replacement for {collection}"
                    )));
                }
            }
            prepared.push((id, record));
        }
        let count = prepared.len();

        let recorded = self.db.transact(|txn| {
            txn.clear(collection)?;
            for (id, mut record) in prepared {
                let id = assign_id(txn, collection, id, &mut record)?;
                txn.put(collection, &id.to_key(), &record, true)?;
            }
            self.record(txn, collection, UpdateAction::Bulk, JsonValue::Null)
        })?;

        info!("Replaced {collection} with {count} records");
        self.announce(recorded);
        Ok(())
    }

    /// Adds a new record and returns it as stored.
    ///
    /// Auto-identifier collections assign the id when the record has none.
    pub fn insert(&self, collection: Collection, mut record: JsonValue) -> Result<JsonValue, StoreError> {
        let id = validate_record(collection, &record)?;

        let (stored, recorded) = self.db.transact(|txn| {
            let id = assign_id(txn, collection, id, &mut record)?;
            if !txn.put(collection, &id.to_key(), &record, false)? {
                return Err(StoreError::DuplicateKey {
                    collection,
                    id: id.to_string(),
                });
            }
            let recorded = self.record(txn, collection, UpdateAction::Add, record.clone())?;
            Ok((record, recorded))
        })?;

        debug!("Inserted into {collection}");
        self.announce(recorded);
        Ok(stored)
    }

    /// Inserts or overwrites the record with the same id.
    pub fn update(&self, collection: Collection, record: JsonValue) -> Result<JsonValue, StoreError> {
        let id = validate_record(collection, &record)?.ok_or_else(|| {
            StoreError::validation(format!("Updating {collection} requires the record's id"))
        })?;

        let recorded = self.db.transact(|txn| {
            if let RecordId::Seq(n) = &id {
                txn.advance_sequence(collection, *n)?;
            }
            txn.put(collection, &id.to_key(), &record, true)?;
            self.record(txn, collection, UpdateAction::Update, record.clone())
        })?;

        debug!("Updated {collection}/{id}");
        self.announce(recorded);
        Ok(record)
    }

    /// Deletes a record. A missing id is not an error: nothing is written,
    /// logged or announced, and `false` is returned.
    pub fn remove(&self, collection: Collection, id: &RecordId) -> Result<bool, StoreError> {
        id.ensure_fits(collection)?;

        let outcome = self.db.transact(|txn| {
            if !txn.delete(collection, &id.to_key())? {
                return Ok(None);
            }
            self.record(txn, collection, UpdateAction::Delete, json!({ "id": id.to_json() }))
                .map(Some)
        })?;

        match outcome {
            Some(recorded) => {
                debug!("Removed {collection}/{id}");
                self.announce(recorded);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn notifications(&self) -> Result<Vec<Notification>, StoreError> {
        self.list()
    }

    pub fn unread_notifications(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(self.notifications()?.into_iter().filter(|n| !n.read).collect())
    }

    /// Flags a notification as read, keeping it. Returns `false` when no
    /// such notification exists.
    pub fn mark_notification_as_read(&self, id: u64) -> Result<bool, StoreError> {
        let key = RecordId::Seq(id).to_key();
        self.db.transact(|txn| {
            let Some(raw) = txn.get(Collection::Notifications, &key)? else {
                return Ok(false);
            };
            let mut notification: Notification = serde_json::from_value(raw)?;
            notification.read = true;
            txn.put(Collection::Notifications, &key, &serde_json::to_value(&notification)?, true)?;
            Ok(true)
        })
    }

    /// Deletes one notification.
    pub fn dismiss_notification(&self, id: u64) -> Result<bool, StoreError> {
        let key = RecordId::Seq(id).to_key();
        self.db.transact(|txn| txn.delete(Collection::Notifications, &key))
    }

    /// The newest update-log entries, newest first, re-titled for display.
    pub fn recent_updates(&self) -> Result<Vec<RecentUpdate>, StoreError> {
        let entries: Vec<UpdateEntry> = self.list()?;
        Ok(update_recorder::latest(entries, self.config.recent_updates_limit))
    }

    /// Acknowledges an update by deleting its log entry.
    pub fn mark_update_as_read(&self, id: u64) -> Result<bool, StoreError> {
        let key = RecordId::Seq(id).to_key();
        self.db.transact(|txn| txn.delete(Collection::Updates, &key))
    }

    pub fn subscribe_to_updates(&self, listener: impl Fn(&MutationEvent) + Send + Sync + 'static) -> Subscription {
        self.bus.subscribe_to_updates(listener)
    }

    pub fn subscribe_to_notifications(
        &self,
        listener: impl Fn(&NotificationEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe_to_notifications(listener)
    }

    /// Empties every collection. Local storage is kept.
    pub fn clear_all_records(&self) -> Result<usize, StoreError> {
        let cleared = self.db.clear_all_records()?;
        info!("Cleared {cleared} records");
        Ok(cleared)
    }

    /// Drops all records, sequences and local storage.
    pub fn reset_database(&self) -> Result<(), StoreError> {
        self.db.reset_database()
    }

    /// Flushes and closes the backend; later calls fail with
    /// [`StoreError::StoreUnavailable`].
    pub fn close(&self) -> Result<(), StoreError> {
        self.db.close_database()
    }

    /// Appends the log entry and notification for a mutation inside its
    /// transaction.
    fn record(
        &self,
        txn: &mut dyn WriteTxn,
        collection: Collection,
        action: UpdateAction,
        data: JsonValue,
    ) -> Result<Option<Recorded>, StoreError> {
        if !update_recorder::should_log(collection, action) {
            return Ok(None);
        }
        let timestamp = now_timestamp();

        let mut notification = update_recorder::synthesize_notification(collection, action, &data, &timestamp);
        if let Some(notification) = notification.as_mut() {
            let id = txn.next_sequence(Collection::Notifications)?;
            notification.id = Some(id);
            txn.put(
                Collection::Notifications,
                &RecordId::Seq(id).to_key(),
                &serde_json::to_value(&*notification)?,
                false,
            )?;
        }

        let mut entry = update_recorder::log_entry(collection, action, data, &timestamp);
        let id = txn.next_sequence(Collection::Updates)?;
        entry.id = Some(id);
        txn.put(Collection::Updates, &RecordId::Seq(id).to_key(), &serde_json::to_value(&entry)?, false)?;

        Ok(Some(Recorded { entry, notification }))
    }

    fn announce(&self, recorded: Option<Recorded>) {
        let Some(Recorded { entry, notification }) = recorded else {
            return;
        };
        self.bus.publish_update(&MutationEvent { entry });
        if let Some(notification) = notification {
            self.bus.publish_notification(&NotificationEvent { notification });
        }
    }
}

/// Resolves the id a record is stored under, assigning one for
/// auto-identifier records that have none.
fn assign_id(
    txn: &mut dyn WriteTxn,
    collection: Collection,
    id: Option<RecordId>,
    record: &mut JsonValue,
) -> Result<RecordId, StoreError> {
    match id {
        Some(RecordId::Seq(n)) => {
            txn.advance_sequence(collection, n)?;
            Ok(RecordId::Seq(n))
        }
        Some(id) => Ok(id),
        None => {
            let n = txn.next_sequence(collection)?;
            if let Some(fields) = record.as_object_mut() {
                fields.insert("id".to_string(), JsonValue::from(n));
            }
            Ok(RecordId::Seq(n))
        }
    }
}
