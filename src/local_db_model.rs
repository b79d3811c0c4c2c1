//! Record schemas for every collection.
//!
//! Records travel and persist as JSON objects. Each collection has a typed
//! view that names its required fields; [`validate_record`] checks a raw
//! record against that view before it reaches a transaction. Fields the
//! schema does not name are kept in `extra` and survive a round trip
//! untouched.
//!
//! ```rust
//! use acad_guide_core::collection::Collection;
//! use acad_guide_core::local_db_model::validate_record;
//! use serde_json::json;
//!
//! let lesson = json!({
//!     "id": "lesson-1",
//!     "courseId": "course-1",
//!     "title": "Introduction to Python",
//!     "content": "# Hello",
//!     "estimatedMinutes": 30
//! });
//! assert!(validate_record(Collection::Lessons, &lesson).is_ok());
//! assert!(validate_record(Collection::Lessons, &json!({"id": "lesson-2"})).is_err());
//! ```

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::collection::{extract_id, Collection, RecordId};
use crate::error::StoreError;

type Extra = Map<String, JsonValue>;

/// Typed view of one collection's records.
pub trait CollectionRecord: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    /// Checks that serde cannot express.
    fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CollectionRecord for Department {
    const COLLECTION: Collection = Collection::Departments;

    fn check(&self) -> Result<(), StoreError> {
        not_blank("department name", &self.name)?;
        not_blank("department code", &self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub department_id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CollectionRecord for Course {
    const COLLECTION: Collection = Collection::Courses;

    fn check(&self) -> Result<(), StoreError> {
        not_blank("course name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CollectionRecord for Lesson {
    const COLLECTION: Collection = Collection::Lessons;

    fn check(&self) -> Result<(), StoreError> {
        not_blank("lesson title", &self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD` date.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CollectionRecord for Event {
    const COLLECTION: Collection = Collection::Events;

    fn check(&self) -> Result<(), StoreError> {
        not_blank("event title", &self.title)?;
        let parses = DateTime::parse_from_rfc3339(&self.date).is_ok()
            || NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").is_ok();
        if parses {
            Ok(())
        } else {
            Err(StoreError::validation(format!("Event date '{}' is not a valid date", self.date)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
    pub id: String,
    pub title: String,
    pub cards: Vec<Flashcard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CollectionRecord for FlashcardSet {
    const COLLECTION: Collection = Collection::Flashcards;

    fn check(&self) -> Result<(), StoreError> {
        not_blank("flashcard set title", &self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub answer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CollectionRecord for Quiz {
    const COLLECTION: Collection = Collection::Quizzes;

    fn check(&self) -> Result<(), StoreError> {
        not_blank("quiz title", &self.title)?;
        for (index, question) in self.questions.iter().enumerate() {
            if question.answer >= question.options.len() {
                return Err(StoreError::validation(format!(
                    "Quiz '{}' question {} answers option {} of {}",
                    self.id,
                    index + 1,
                    question.answer,
                    question.options.len()
                )));
            }
        }
        Ok(())
    }
}

/// The record a notification points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTo {
    /// Store name of the collection.
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    pub read: bool,
    pub related_to: RelatedTo,
}

impl CollectionRecord for Notification {
    const COLLECTION: Collection = Collection::Notifications;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Add,
    Update,
    Delete,
    Bulk,
}

/// Append-only log entry written for each mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub timestamp: String,
    pub store_name: Collection,
    pub action: UpdateAction,
    /// The affected record, `{id}` for deletes, `null` for bulk replaces.
    #[serde(default)]
    pub data: JsonValue,
}

impl CollectionRecord for UpdateEntry {
    const COLLECTION: Collection = Collection::Updates;
}

/// An update-log entry re-titled for the recent-updates feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUpdate {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Checks `record` against its collection's schema and returns its id.
///
/// The id is `None` only for auto-identifier collections when the record
/// has not been assigned one yet.
pub fn validate_record(collection: Collection, record: &JsonValue) -> Result<Option<RecordId>, StoreError> {
    if !record.is_object() {
        return Err(StoreError::validation(format!("{collection} records must be JSON objects")));
    }
    match collection {
        Collection::Departments => check_as::<Department>(record)?,
        Collection::Courses => check_as::<Course>(record)?,
        Collection::Lessons => check_as::<Lesson>(record)?,
        Collection::Events => check_as::<Event>(record)?,
        Collection::Flashcards => check_as::<FlashcardSet>(record)?,
        Collection::Quizzes => check_as::<Quiz>(record)?,
        Collection::Notifications => check_as::<Notification>(record)?,
        Collection::Updates => check_as::<UpdateEntry>(record)?,
    }
    extract_id(collection, record)
}

fn check_as<T: CollectionRecord>(record: &JsonValue) -> Result<(), StoreError> {
    let typed = T::deserialize(record)
        .map_err(|e| StoreError::validation(format!("Invalid {} record: {e}", T::COLLECTION)))?;
    typed.check()
}

fn not_blank(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::validation(format!("{field} cannot be blank")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "id": "course-1",
            "departmentId": "dept-1",
            "name": "Introduction to Programming",
            "code": "CS101",
            "credits": 3,
            "syllabusUrl": "https://example.edu/cs101"
        });
        let course: Course = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(course.credits, Some(3));
        assert_eq!(serde_json::to_value(&course).unwrap(), raw);
    }

    #[test]
    fn test_quiz_answer_must_point_at_an_option() {
        let quiz = json!({
            "id": "quiz-1",
            "title": "Python Quiz",
            "questions": [{"question": "Keyword?", "options": ["def", "fun"], "answer": 2}]
        });
        let err = validate_record(Collection::Quizzes, &quiz).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_event_dates() {
        let mut event = json!({"id": "event-1", "title": "Seminar", "date": "2025-03-01T10:00:00.000Z"});
        assert!(validate_record(Collection::Events, &event).is_ok());
        event["date"] = json!("2025-03-01");
        assert!(validate_record(Collection::Events, &event).is_ok());
        event["date"] = json!("next tuesday");
        assert!(validate_record(Collection::Events, &event).is_err());
    }

    #[test]
    fn test_non_objects_rejected() {
        assert!(validate_record(Collection::Departments, &json!(["dept-1"])).is_err());
    }

    #[test]
    fn test_update_entry_wire_format() {
        let entry = UpdateEntry {
            id: Some(3),
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            store_name: Collection::Lessons,
            action: UpdateAction::Bulk,
            data: JsonValue::Null,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["storeName"], "lessons");
        assert_eq!(value["action"], "bulk");
        assert_eq!(validate_record(Collection::Updates, &value).unwrap(), Some(RecordId::Seq(3)));
    }
}
