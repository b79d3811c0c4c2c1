//! In-memory storage backend.
//!
//! Writes apply in place and record what they overwrote. A failed
//! transaction body replays that log backwards to restore the prior state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::local_db_state::{BackendKind, StorageBackend, WriteTxn};

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<Collection, BTreeMap<Vec<u8>, JsonValue>>,
    sequences: HashMap<Collection, u64>,
    slots: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn read_all(&self, collection: Collection) -> Result<Vec<JsonValue>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned("memory store"))?;
        Ok(state
            .collections
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn read(&self, collection: Collection, key: &[u8]) -> Result<Option<JsonValue>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned("memory store"))?;
        Ok(state
            .collections
            .get(&collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn write(&self, body: &mut dyn FnMut(&mut dyn WriteTxn) -> Result<(), StoreError>) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::poisoned("memory store"))?;
        let mut txn = MemoryWriteTxn {
            state: &mut *state,
            undo: Vec::new(),
        };
        let result = body(&mut txn);
        if result.is_err() {
            txn.rollback();
        }
        result
    }

    fn read_slot(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::poisoned("memory store"))?;
        Ok(state.slots.get(key).cloned())
    }

    fn write_slot(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::poisoned("memory store"))?;
        match value {
            Some(value) => {
                state.slots.insert(key.to_string(), value.to_string());
            }
            None => {
                state.slots.remove(key);
            }
        }
        Ok(())
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::poisoned("memory store"))?;
        *state = MemoryState::default();
        Ok(())
    }
}

/// Value overwritten by a write, restored in reverse order on rollback.
enum Undo {
    Record {
        collection: Collection,
        key: Vec<u8>,
        previous: Option<JsonValue>,
    },
    Cleared {
        collection: Collection,
        previous: BTreeMap<Vec<u8>, JsonValue>,
    },
    Sequence {
        collection: Collection,
        previous: Option<u64>,
    },
}

struct MemoryWriteTxn<'a> {
    state: &'a mut MemoryState,
    undo: Vec<Undo>,
}

impl MemoryWriteTxn<'_> {
    fn rollback(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Record {
                    collection,
                    key,
                    previous,
                } => {
                    let records = self.state.collections.entry(collection).or_default();
                    match previous {
                        Some(record) => {
                            records.insert(key, record);
                        }
                        None => {
                            records.remove(&key);
                        }
                    }
                }
                Undo::Cleared { collection, previous } => {
                    self.state.collections.insert(collection, previous);
                }
                Undo::Sequence { collection, previous } => match previous {
                    Some(value) => {
                        self.state.sequences.insert(collection, value);
                    }
                    None => {
                        self.state.sequences.remove(&collection);
                    }
                },
            }
        }
    }

    fn set_sequence(&mut self, collection: Collection, value: u64) {
        let previous = self.state.sequences.insert(collection, value);
        self.undo.push(Undo::Sequence { collection, previous });
    }
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn get(&self, collection: Collection, key: &[u8]) -> Result<Option<JsonValue>, StoreError> {
        Ok(self
            .state
            .collections
            .get(&collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn put(
        &mut self,
        collection: Collection,
        key: &[u8],
        record: &JsonValue,
        overwrite: bool,
    ) -> Result<bool, StoreError> {
        let records = self.state.collections.entry(collection).or_default();
        if !overwrite && records.contains_key(key) {
            return Ok(false);
        }
        let previous = records.insert(key.to_vec(), record.clone());
        self.undo.push(Undo::Record {
            collection,
            key: key.to_vec(),
            previous,
        });
        Ok(true)
    }

    fn delete(&mut self, collection: Collection, key: &[u8]) -> Result<bool, StoreError> {
        let removed = self
            .state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.remove(key));
        let found = removed.is_some();
        if found {
            self.undo.push(Undo::Record {
                collection,
                key: key.to_vec(),
                previous: removed,
            });
        }
        Ok(found)
    }

    fn clear(&mut self, collection: Collection) -> Result<usize, StoreError> {
        let Some(previous) = self.state.collections.remove(&collection) else {
            return Ok(0);
        };
        let count = previous.len();
        self.undo.push(Undo::Cleared { collection, previous });
        Ok(count)
    }

    fn next_sequence(&mut self, collection: Collection) -> Result<u64, StoreError> {
        let current = self.state.sequences.get(&collection).copied().unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::sequence_exhausted(collection))?;
        self.set_sequence(collection, next);
        Ok(next)
    }

    fn advance_sequence(&mut self, collection: Collection, floor: u64) -> Result<(), StoreError> {
        let current = self.state.sequences.get(&collection).copied().unwrap_or(0);
        if current < floor {
            self.set_sequence(collection, floor);
        }
        Ok(())
    }
}
