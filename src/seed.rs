//! First-run catalog import.

use log::info;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::acad_store::AcadStore;
use crate::bookmarks::Bookmark;
use crate::collection::Collection;
use crate::error::StoreError;
use crate::local_storage::INITIALIZED_KEY;

/// Initial contents handed to [`AcadStore::seed_once`]. Empty lists leave
/// their collection alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub departments: Vec<JsonValue>,
    pub courses: Vec<JsonValue>,
    pub lessons: Vec<JsonValue>,
    pub events: Vec<JsonValue>,
    pub flashcards: Vec<JsonValue>,
    pub quizzes: Vec<JsonValue>,
    pub bookmarks: Vec<Bookmark>,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    fn into_collections(self) -> (Vec<(Collection, Vec<JsonValue>)>, Vec<Bookmark>) {
        let collections = vec![
            (Collection::Departments, self.departments),
            (Collection::Courses, self.courses),
            (Collection::Lessons, self.lessons),
            (Collection::Events, self.events),
            (Collection::Flashcards, self.flashcards),
            (Collection::Quizzes, self.quizzes),
        ];
        (collections, self.bookmarks)
    }
}

impl AcadStore {
    /// Imports `seed` unless the store was already initialized. Returns
    /// whether anything was written.
    ///
    /// The initialized flag is set last, so an import that fails part way
    /// runs again on the next call.
    pub fn seed_once(&self, seed: SeedData) -> Result<bool, StoreError> {
        let storage = self.local_storage();
        if storage.get_item(INITIALIZED_KEY)?.as_deref() == Some("true") {
            return Ok(false);
        }

        let (collections, bookmarks) = seed.into_collections();
        for (collection, records) in collections {
            if !records.is_empty() {
                self.replace_all(collection, records)?;
            }
        }
        if !bookmarks.is_empty() {
            self.bookmarks().replace(&bookmarks)?;
        }
        storage.set_item(INITIALIZED_KEY, "true")?;
        info!("Seeded initial catalog");
        Ok(true)
    }
}
