//! Key-value slots, the local-storage half of the store.
//!
//! Each call is its own transaction, separate from collection transactions.
//! Values are strings; the JSON helpers read and write whole documents.

use std::sync::Arc;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::local_db_state::AppDbState;

pub const BOOKMARKS_KEY: &str = "acadGuide:bookmarks";
pub const INITIALIZED_KEY: &str = "acadGuideInitialized";
pub const USER_KEY: &str = "acadGuideUser";
pub const THEME_KEY: &str = "acadGuideTheme";
pub const VIEWED_LESSONS_KEY: &str = "acadGuide:viewedLessons";
pub const QUIZ_ATTEMPTS_KEY: &str = "acadGuide:quizAttempts";

#[derive(Clone)]
pub struct LocalStorage {
    db: Arc<AppDbState>,
}

impl LocalStorage {
    pub fn new(db: Arc<AppDbState>) -> Self {
        LocalStorage { db }
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.db.get_item(key)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.set_item(key, value)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.db.remove_item(key)
    }

    /// Reads a JSON document. A value that no longer parses is logged and
    /// treated as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get_item(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring unreadable value under '{key}': {e}");
                Ok(None)
            }
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }

    /// Reads a JSON array, defaulting to empty.
    pub(crate) fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        Ok(self.get_json(key)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots() {
        let storage = LocalStorage::new(Arc::new(AppDbState::in_memory()));
        assert_eq!(storage.get_item(THEME_KEY).unwrap(), None);
        storage.set_item(THEME_KEY, "dark").unwrap();
        assert_eq!(storage.get_item(THEME_KEY).unwrap().as_deref(), Some("dark"));
        storage.remove_item(THEME_KEY).unwrap();
        storage.remove_item(THEME_KEY).unwrap();
        assert_eq!(storage.get_item(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_json_reads_as_absent() {
        let storage = LocalStorage::new(Arc::new(AppDbState::in_memory()));
        storage.set_item(BOOKMARKS_KEY, "[{broken").unwrap();
        let list: Vec<serde_json::Value> = storage.get_list(BOOKMARKS_KEY).unwrap();
        assert!(list.is_empty());
    }
}
