//! Named collections of the record store and the identifiers that key them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StoreError;

/// Largest key LMDB accepts with its default build settings.
pub const MAX_KEY_BYTES: usize = 511;

/// A named partition of the record store.
///
/// `Notifications` and `Updates` receive sequential numeric identifiers;
/// every other collection is keyed by a caller-provided string `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Departments,
    Courses,
    Lessons,
    Events,
    Flashcards,
    Quizzes,
    Notifications,
    Updates,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Departments,
        Collection::Courses,
        Collection::Lessons,
        Collection::Events,
        Collection::Flashcards,
        Collection::Quizzes,
        Collection::Notifications,
        Collection::Updates,
    ];

    /// Store name, also used as the LMDB database name.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Departments => "departments",
            Collection::Courses => "courses",
            Collection::Lessons => "lessons",
            Collection::Events => "events",
            Collection::Flashcards => "flashcards",
            Collection::Quizzes => "quizzes",
            Collection::Notifications => "notifications",
            Collection::Updates => "updates",
        }
    }

    /// Singular human label.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Departments => "Department",
            Collection::Courses => "Course",
            Collection::Lessons => "Lesson",
            Collection::Events => "Event",
            Collection::Flashcards => "Flashcard Set",
            Collection::Quizzes => "Quiz",
            Collection::Notifications => "Notification",
            Collection::Updates => "Update",
        }
    }

    /// Collections whose single-record changes notify students.
    pub fn is_user_facing(self) -> bool {
        matches!(
            self,
            Collection::Lessons | Collection::Events | Collection::Flashcards | Collection::Quizzes
        )
    }

    pub fn has_auto_id(self) -> bool {
        matches!(self, Collection::Notifications | Collection::Updates)
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.name() == s)
            .ok_or_else(|| StoreError::validation(format!("Unknown collection: '{s}'")))
    }
}

/// Identifier of one record inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Seq(u64),
    Text(String),
}

impl RecordId {
    /// Builds a string identifier, rejecting values LMDB cannot key.
    pub fn text(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(StoreError::validation("Record id cannot be empty"));
        }
        if id.len() > MAX_KEY_BYTES {
            return Err(StoreError::validation(format!(
                "Record id is {} bytes, the limit is {MAX_KEY_BYTES}",
                id.len()
            )));
        }
        Ok(RecordId::Text(id))
    }

    /// Parses an identifier received as text for the given collection.
    pub fn parse(collection: Collection, raw: &str) -> Result<Self, StoreError> {
        if collection.has_auto_id() {
            raw.trim()
                .parse::<u64>()
                .map(RecordId::Seq)
                .map_err(|_| StoreError::validation(format!("{collection} ids are numeric, got '{raw}'")))
        } else {
            RecordId::text(raw)
        }
    }

    /// Key bytes. Sequential ids are big-endian so key order is numeric order.
    pub fn to_key(&self) -> Vec<u8> {
        match self {
            RecordId::Seq(n) => n.to_be_bytes().to_vec(),
            RecordId::Text(s) => s.as_bytes().to_vec(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            RecordId::Seq(n) => JsonValue::from(*n),
            RecordId::Text(s) => JsonValue::from(s.as_str()),
        }
    }

    fn fits(&self, collection: Collection) -> bool {
        matches!(
            (self, collection.has_auto_id()),
            (RecordId::Seq(_), true) | (RecordId::Text(_), false)
        )
    }

    pub(crate) fn ensure_fits(&self, collection: Collection) -> Result<(), StoreError> {
        if self.fits(collection) {
            Ok(())
        } else {
            Err(StoreError::validation(format!("Id {self} cannot key {collection}")))
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Seq(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Seq(n)
    }
}

/// Reads the `id` field of a record.
///
/// Returns `Ok(None)` only for auto-identifier collections when the record
/// has no id yet.
pub fn extract_id(collection: Collection, record: &JsonValue) -> Result<Option<RecordId>, StoreError> {
    match record.get("id") {
        None | Some(JsonValue::Null) if collection.has_auto_id() => Ok(None),
        None | Some(JsonValue::Null) => Err(StoreError::validation(format!(
            "{collection} records require an 'id' field"
        ))),
        Some(JsonValue::Number(n)) if collection.has_auto_id() => n
            .as_u64()
            .map(|n| Some(RecordId::Seq(n)))
            .ok_or_else(|| StoreError::validation(format!("{collection} ids must be unsigned integers"))),
        Some(JsonValue::String(s)) if !collection.has_auto_id() => RecordId::text(s.as_str()).map(Some),
        Some(other) => Err(StoreError::validation(format!("Invalid id {other} for {collection}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(collection.name().parse::<Collection>().unwrap(), collection);
        }
        assert!("grades".parse::<Collection>().is_err());
    }

    #[test]
    fn test_seq_keys_sort_numerically() {
        let two = RecordId::Seq(2).to_key();
        let ten = RecordId::Seq(10).to_key();
        assert!(two < ten);
    }

    #[test]
    fn test_extract_id() {
        let lesson = json!({"id": "L1"});
        assert_eq!(
            extract_id(Collection::Lessons, &lesson).unwrap(),
            Some(RecordId::Text("L1".into()))
        );
        assert!(extract_id(Collection::Lessons, &json!({"title": "x"})).is_err());
        assert!(extract_id(Collection::Lessons, &json!({"id": 4})).is_err());
        assert_eq!(extract_id(Collection::Notifications, &json!({"title": "x"})).unwrap(), None);
        assert_eq!(
            extract_id(Collection::Updates, &json!({"id": 7})).unwrap(),
            Some(RecordId::Seq(7))
        );
        assert!(extract_id(Collection::Updates, &json!({"id": "7"})).is_err());
    }

    #[test]
    fn test_text_id_limits() {
        assert!(RecordId::text("").is_err());
        assert!(RecordId::text("x".repeat(MAX_KEY_BYTES)).is_ok());
        assert!(RecordId::text("x".repeat(MAX_KEY_BYTES + 1)).is_err());
    }

    #[test]
    fn test_parse_for_collection() {
        assert_eq!(RecordId::parse(Collection::Notifications, " 12 ").unwrap(), RecordId::Seq(12));
        assert!(RecordId::parse(Collection::Notifications, "abc").is_err());
        assert_eq!(
            RecordId::parse(Collection::Quizzes, "quiz-1").unwrap(),
            RecordId::Text("quiz-1".into())
        );
    }
}
