//! Saved references to lessons, events, flashcard sets and quizzes.
//!
//! The whole list lives in one local-storage slot. Every change reads the
//! list, edits it and writes it back; there is no locking between those
//! steps.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::StoreError;
use crate::local_storage::{LocalStorage, BOOKMARKS_KEY};
use crate::update_recorder::now_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkKind {
    Lesson,
    Event,
    Flashcard,
    Quiz,
}

impl BookmarkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BookmarkKind::Lesson => "lesson",
            BookmarkKind::Event => "event",
            BookmarkKind::Flashcard => "flashcard",
            BookmarkKind::Quiz => "quiz",
        }
    }

    /// Collection holding the bookmarked record.
    pub fn collection(self) -> Collection {
        match self {
            BookmarkKind::Lesson => Collection::Lessons,
            BookmarkKind::Event => Collection::Events,
            BookmarkKind::Flashcard => Collection::Flashcards,
            BookmarkKind::Quiz => Collection::Quizzes,
        }
    }
}

impl Display for BookmarkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookmarkKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(BookmarkKind::Lesson),
            "event" => Ok(BookmarkKind::Event),
            "flashcard" => Ok(BookmarkKind::Flashcard),
            "quiz" => Ok(BookmarkKind::Quiz),
            other => Err(StoreError::validation(format!("Unknown bookmark type: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BookmarkKind,
    pub title: String,
    pub timestamp: String,
}

impl Bookmark {
    fn is(&self, id: &str, kind: BookmarkKind) -> bool {
        self.id == id && self.kind == kind
    }
}

#[derive(Clone)]
pub struct BookmarkStore {
    storage: LocalStorage,
}

impl BookmarkStore {
    pub fn new(storage: LocalStorage) -> Self {
        BookmarkStore { storage }
    }

    pub fn list(&self) -> Result<Vec<Bookmark>, StoreError> {
        self.storage.get_list(BOOKMARKS_KEY)
    }

    /// Saves a bookmark. Returns `false`, leaving the list as it was, when
    /// `(id, kind)` is already saved.
    pub fn add(&self, id: &str, kind: BookmarkKind, title: &str) -> Result<bool, StoreError> {
        let mut bookmarks = self.list()?;
        if bookmarks.iter().any(|b| b.is(id, kind)) {
            return Ok(false);
        }
        bookmarks.push(Bookmark {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            timestamp: now_timestamp(),
        });
        self.storage.set_json(BOOKMARKS_KEY, &bookmarks)?;
        debug!("Bookmarked {kind} '{id}'");
        Ok(true)
    }

    /// Returns whether a bookmark was removed.
    pub fn remove(&self, id: &str, kind: BookmarkKind) -> Result<bool, StoreError> {
        let mut bookmarks = self.list()?;
        let before = bookmarks.len();
        bookmarks.retain(|b| !b.is(id, kind));
        self.storage.set_json(BOOKMARKS_KEY, &bookmarks)?;
        Ok(bookmarks.len() != before)
    }

    pub fn has(&self, id: &str, kind: BookmarkKind) -> Result<bool, StoreError> {
        Ok(self.list()?.iter().any(|b| b.is(id, kind)))
    }

    /// Overwrites the whole list.
    pub fn replace(&self, bookmarks: &[Bookmark]) -> Result<(), StoreError> {
        self.storage.set_json(BOOKMARKS_KEY, bookmarks)
    }
}
