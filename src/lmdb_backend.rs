//! LMDB storage backend.
//!
//! One environment directory holds a named database per collection, a
//! `__sequences` database with the identifier counters of auto-id
//! collections, and a `local_storage` database for key-value slots.

use std::collections::HashMap;
use std::fs;

use lmdb::{Cursor, Database, DatabaseFlags, Environment, RwTransaction, Transaction, WriteFlags};
use log::{debug, error};
use serde_json::Value as JsonValue;

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::local_db_state::{BackendKind, StorageBackend, WriteTxn};

const SEQUENCES_DB: &str = "__sequences";
const SLOTS_DB: &str = "local_storage";
const MAX_DBS: u32 = 16;

struct Databases {
    collections: HashMap<Collection, Database>,
    sequences: Database,
    slots: Database,
}

impl Databases {
    fn collection(&self, collection: Collection) -> Result<Database, StoreError> {
        self.collections
            .get(&collection)
            .copied()
            .ok_or_else(|| StoreError::Transaction(format!("No LMDB database for {collection}")))
    }
}

pub struct LmdbBackend {
    env: Environment,
    dbs: Databases,
}

impl LmdbBackend {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let dir = config.lmdb_dir();
        let unavailable = |e: &dyn std::fmt::Display| {
            StoreError::StoreUnavailable(format!("{}: {e}", dir.display()))
        };

        fs::create_dir_all(&dir).map_err(|e| unavailable(&e))?;
        let env = Environment::new()
            .set_max_dbs(MAX_DBS)
            .set_map_size(config.map_size_bytes())
            .open(&dir)
            .map_err(|e| unavailable(&e))?;

        // Creating every database up front is the whole schema migration.
        let mut collections = HashMap::new();
        for collection in Collection::ALL {
            let db = env
                .create_db(Some(collection.name()), DatabaseFlags::empty())
                .map_err(|e| unavailable(&e))?;
            collections.insert(collection, db);
        }
        let sequences = env
            .create_db(Some(SEQUENCES_DB), DatabaseFlags::empty())
            .map_err(|e| unavailable(&e))?;
        let slots = env
            .create_db(Some(SLOTS_DB), DatabaseFlags::empty())
            .map_err(|e| unavailable(&e))?;

        Ok(LmdbBackend {
            env,
            dbs: Databases {
                collections,
                sequences,
                slots,
            },
        })
    }
}

impl StorageBackend for LmdbBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Lmdb
    }

    fn read_all(&self, collection: Collection) -> Result<Vec<JsonValue>, StoreError> {
        let db = self.dbs.collection(collection)?;
        let txn = self.env.begin_ro_txn()?;
        let mut records = Vec::new();
        {
            let mut cursor = txn.open_ro_cursor(db)?;
            // `iter` ends cleanly on an empty database; `iter_start` panics there.
            for (_key, bytes) in cursor.iter() {
                records.push(serde_json::from_slice(bytes)?);
            }
        }
        debug!("Read {} records from {collection}", records.len());
        Ok(records)
    }

    fn read(&self, collection: Collection, key: &[u8]) -> Result<Option<JsonValue>, StoreError> {
        let db = self.dbs.collection(collection)?;
        let txn = self.env.begin_ro_txn()?;
        let record = match txn.get(db, &key) {
            Ok(bytes) => Some(serde_json::from_slice(bytes)?),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(record)
    }

    fn write(&self, body: &mut dyn FnMut(&mut dyn WriteTxn) -> Result<(), StoreError>) -> Result<(), StoreError> {
        let txn = self.env.begin_rw_txn()?;
        let mut scoped = LmdbWriteTxn { txn, dbs: &self.dbs };
        match body(&mut scoped) {
            Ok(()) => {
                scoped.txn.commit().map_err(|e| {
                    error!("LMDB commit failed: {e}");
                    StoreError::from(e)
                })?;
                Ok(())
            }
            Err(e) => {
                scoped.txn.abort();
                Err(e)
            }
        }
    }

    fn read_slot(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.dbs.slots, &key) {
            Ok(bytes) => Some(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| StoreError::Transaction(format!("Slot '{key}' is not UTF-8: {e}")))?,
            ),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(value)
    }

    fn write_slot(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        match value {
            Some(value) => txn.put(self.dbs.slots, &key, &value, WriteFlags::empty())?,
            None => match txn.del(self.dbs.slots, &key, None) {
                Ok(()) | Err(lmdb::Error::NotFound) => {}
                Err(e) => return Err(e.into()),
            },
        }
        txn.commit()?;
        Ok(())
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        for db in self.dbs.collections.values() {
            txn.clear_db(*db)?;
        }
        txn.clear_db(self.dbs.sequences)?;
        txn.clear_db(self.dbs.slots)?;
        txn.commit()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        // The environment itself closes on drop.
        self.env.sync(true)?;
        Ok(())
    }
}

struct LmdbWriteTxn<'env> {
    txn: RwTransaction<'env>,
    dbs: &'env Databases,
}

fn decode_sequence(bytes: &[u8]) -> Result<u64, StoreError> {
    <[u8; 8]>::try_from(bytes)
        .map(u64::from_be_bytes)
        .map_err(|_| StoreError::Transaction("Corrupt sequence value".to_string()))
}

impl LmdbWriteTxn<'_> {
    fn current_sequence(&self, collection: Collection) -> Result<u64, StoreError> {
        match self.txn.get(self.dbs.sequences, &collection.name()) {
            Ok(bytes) => decode_sequence(bytes),
            Err(lmdb::Error::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn store_sequence(&mut self, collection: Collection, value: u64) -> Result<(), StoreError> {
        self.txn.put(
            self.dbs.sequences,
            &collection.name(),
            &value.to_be_bytes(),
            WriteFlags::empty(),
        )?;
        Ok(())
    }
}

impl WriteTxn for LmdbWriteTxn<'_> {
    fn get(&self, collection: Collection, key: &[u8]) -> Result<Option<JsonValue>, StoreError> {
        let db = self.dbs.collection(collection)?;
        match self.txn.get(db, &key) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(
        &mut self,
        collection: Collection,
        key: &[u8],
        record: &JsonValue,
        overwrite: bool,
    ) -> Result<bool, StoreError> {
        let db = self.dbs.collection(collection)?;
        let bytes = serde_json::to_vec(record)?;
        let flags = if overwrite {
            WriteFlags::empty()
        } else {
            WriteFlags::NO_OVERWRITE
        };
        match self.txn.put(db, &key, &bytes, flags) {
            Ok(()) => Ok(true),
            Err(lmdb::Error::KeyExist) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, collection: Collection, key: &[u8]) -> Result<bool, StoreError> {
        let db = self.dbs.collection(collection)?;
        match self.txn.del(db, &key, None) {
            Ok(()) => Ok(true),
            Err(lmdb::Error::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self, collection: Collection) -> Result<usize, StoreError> {
        let db = self.dbs.collection(collection)?;
        let count = {
            let mut cursor = self.txn.open_ro_cursor(db)?;
            cursor.iter().count()
        };
        self.txn.clear_db(db)?;
        Ok(count)
    }

    fn next_sequence(&mut self, collection: Collection) -> Result<u64, StoreError> {
        let next = self
            .current_sequence(collection)?
            .checked_add(1)
            .ok_or_else(|| StoreError::sequence_exhausted(collection))?;
        self.store_sequence(collection, next)?;
        Ok(next)
    }

    fn advance_sequence(&mut self, collection: Collection, floor: u64) -> Result<(), StoreError> {
        if self.current_sequence(collection)? < floor {
            self.store_sequence(collection, floor)?;
        }
        Ok(())
    }
}
