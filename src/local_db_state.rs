//! Record store: storage backends and the transactional handle over them.
//!
//! [`AppDbState`] owns one [`StorageBackend`]. The LMDB backend is the
//! durable one; the memory backend serves ephemeral sessions and the
//! fallback when LMDB cannot be opened. Both give each
//! [`AppDbState::transact`] call all-or-nothing semantics.

use std::sync::RwLock;

use log::{info, warn};
use serde_json::Value as JsonValue;

use crate::collection::{Collection, RecordId};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::lmdb_backend::LmdbBackend;
use crate::memory_backend::MemoryBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Lmdb,
    Memory,
}

/// Operations available inside one write transaction.
pub trait WriteTxn {
    fn get(&self, collection: Collection, key: &[u8]) -> Result<Option<JsonValue>, StoreError>;

    /// Writes `record` under `key`. With `overwrite == false` an existing key
    /// is left alone and `Ok(false)` is returned.
    fn put(&mut self, collection: Collection, key: &[u8], record: &JsonValue, overwrite: bool)
        -> Result<bool, StoreError>;

    /// Returns whether the key existed.
    fn delete(&mut self, collection: Collection, key: &[u8]) -> Result<bool, StoreError>;

    /// Empties the collection and returns how many records it held.
    fn clear(&mut self, collection: Collection) -> Result<usize, StoreError>;

    /// Next value of the collection's identifier sequence. Values are never
    /// handed out twice.
    fn next_sequence(&mut self, collection: Collection) -> Result<u64, StoreError>;

    /// Moves the sequence forward so it never hands out `floor` or below.
    fn advance_sequence(&mut self, collection: Collection, floor: u64) -> Result<(), StoreError>;
}

/// A place records and local-storage slots live.
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn read_all(&self, collection: Collection) -> Result<Vec<JsonValue>, StoreError>;

    fn read(&self, collection: Collection, key: &[u8]) -> Result<Option<JsonValue>, StoreError>;

    /// Runs `body` in one write transaction, committing only if it succeeds.
    fn write(&self, body: &mut dyn FnMut(&mut dyn WriteTxn) -> Result<(), StoreError>) -> Result<(), StoreError>;

    fn read_slot(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// `None` removes the slot.
    fn write_slot(&self, key: &str, value: Option<&str>) -> Result<(), StoreError>;

    /// Drops every record, sequence and slot.
    fn reset(&self) -> Result<(), StoreError>;

    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Handle to the record store.
///
/// Operations fail with [`StoreError::StoreUnavailable`] after
/// [`close_database`](AppDbState::close_database).
pub struct AppDbState {
    backend: RwLock<Option<Box<dyn StorageBackend>>>,
    kind: BackendKind,
}

impl AppDbState {
    /// Opens the store described by `config`, creating the LMDB environment
    /// and all collections on first use.
    pub fn init(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        if config.in_memory {
            return Ok(AppDbState::in_memory());
        }
        let backend = LmdbBackend::open(config)?;
        info!("Record store opened at {}", config.lmdb_dir().display());
        Ok(AppDbState::with_backend(Box::new(backend)))
    }

    pub fn in_memory() -> Self {
        AppDbState::with_backend(Box::new(MemoryBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        let kind = backend.kind();
        AppDbState {
            backend: RwLock::new(Some(backend)),
            kind,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.backend.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn with_open<T>(&self, f: impl FnOnce(&dyn StorageBackend) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let guard = self.backend.read().map_err(|_| StoreError::poisoned("record store"))?;
        match guard.as_deref() {
            Some(backend) => f(backend),
            None => Err(StoreError::StoreUnavailable("database is closed".to_string())),
        }
    }

    pub fn get(&self, collection: Collection) -> Result<Vec<JsonValue>, StoreError> {
        self.with_open(|backend| backend.read_all(collection))
    }

    pub fn get_by_id(&self, collection: Collection, id: &RecordId) -> Result<Option<JsonValue>, StoreError> {
        id.ensure_fits(collection)?;
        self.with_open(|backend| backend.read(collection, &id.to_key()))
    }

    /// Runs `body` as one all-or-nothing write transaction.
    pub fn transact<T>(
        &self,
        body: impl FnOnce(&mut dyn WriteTxn) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut body = Some(body);
        let mut output = None;
        self.with_open(|backend| {
            backend.write(&mut |txn| {
                let run = body
                    .take()
                    .ok_or_else(|| StoreError::Transaction("transaction body ran twice".to_string()))?;
                output = Some(run(txn)?);
                Ok(())
            })
        })?;
        output.ok_or_else(|| StoreError::Transaction("transaction produced no result".to_string()))
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_open(|backend| backend.read_slot(key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_open(|backend| backend.write_slot(key, Some(value)))
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.with_open(|backend| backend.write_slot(key, None))
    }

    /// Empties every collection, keeping sequences and local storage.
    pub fn clear_all_records(&self) -> Result<usize, StoreError> {
        self.transact(|txn| {
            let mut cleared = 0;
            for collection in Collection::ALL {
                cleared += txn.clear(collection)?;
            }
            Ok(cleared)
        })
    }

    /// Returns the store to its freshly created state.
    pub fn reset_database(&self) -> Result<(), StoreError> {
        self.with_open(|backend| backend.reset())?;
        info!("Record store reset");
        Ok(())
    }

    /// Flushes and releases the backend. Closing twice is a no-op.
    pub fn close_database(&self) -> Result<(), StoreError> {
        let mut guard = self.backend.write().map_err(|_| StoreError::poisoned("record store"))?;
        match guard.take() {
            Some(mut backend) => {
                backend.close()?;
                info!("Record store closed");
            }
            None => warn!("close_database called on a closed store"),
        }
        Ok(())
    }
}
