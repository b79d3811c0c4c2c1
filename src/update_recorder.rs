//! Turns mutations into update-log entries, notifications and the
//! recent-updates feed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use crate::collection::Collection;
use crate::local_db_model::{Notification, RecentUpdate, RelatedTo, UpdateAction, UpdateEntry};

/// Current time in the store's timestamp format (RFC 3339, UTC, milliseconds).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether a mutation of `collection` gets an update-log entry.
///
/// The derived collections never log their own maintenance, and bulk
/// replaces are only logged for user-facing collections.
pub fn should_log(collection: Collection, action: UpdateAction) -> bool {
    if collection.has_auto_id() {
        return false;
    }
    action != UpdateAction::Bulk || collection.is_user_facing()
}

pub fn log_entry(collection: Collection, action: UpdateAction, data: JsonValue, timestamp: &str) -> UpdateEntry {
    UpdateEntry {
        id: None,
        timestamp: timestamp.to_string(),
        store_name: collection,
        action,
        data,
    }
}

fn text_field<'a>(record: &'a JsonValue, field: &str) -> Option<&'a str> {
    record.get(field).and_then(JsonValue::as_str)
}

/// Builds the notification for a mutation, if the mutation warrants one.
///
/// Only `add` and `update` on user-facing collections notify.
pub fn synthesize_notification(
    collection: Collection,
    action: UpdateAction,
    record: &JsonValue,
    timestamp: &str,
) -> Option<Notification> {
    let title = text_field(record, "title").unwrap_or_default();
    let (heading, message) = match (collection, action) {
        (Collection::Lessons, UpdateAction::Add) => {
            let scope = if record.get("courseId").is_some_and(|v| !v.is_null()) {
                "course"
            } else {
                "courses"
            };
            (
                "New Lesson Available",
                format!("A new lesson has been added to your {scope}."),
            )
        }
        (Collection::Lessons, UpdateAction::Update) => (
            "Lesson Updated",
            "A lesson in your courses has been updated with new content.".to_string(),
        ),
        (Collection::Events, UpdateAction::Add) => (
            "New Event Announced",
            format!("A new event \"{title}\" has been scheduled."),
        ),
        (Collection::Events, UpdateAction::Update) => (
            "Event Details Updated",
            format!("The details for event \"{title}\" have been updated."),
        ),
        (Collection::Flashcards, UpdateAction::Add) => (
            "New Flashcard Set Available",
            "A new flashcard set has been added for your studies.".to_string(),
        ),
        (Collection::Flashcards, UpdateAction::Update) => (
            "Flashcard Set Updated",
            "A flashcard set has been updated with new content.".to_string(),
        ),
        (Collection::Quizzes, UpdateAction::Add) => (
            "New Quiz Available",
            "A new quiz has been added to test your knowledge.".to_string(),
        ),
        (Collection::Quizzes, UpdateAction::Update) => (
            "Quiz Updated",
            "A quiz has been updated with new questions or content.".to_string(),
        ),
        _ => return None,
    };

    Some(Notification {
        id: None,
        title: heading.to_string(),
        message,
        timestamp: timestamp.to_string(),
        read: false,
        related_to: RelatedTo {
            kind: collection.name().to_string(),
            id: text_field(record, "id").unwrap_or_default().to_string(),
        },
    })
}

/// Re-titles one log entry for the recent-updates feed.
pub fn recent_update(entry: &UpdateEntry) -> RecentUpdate {
    let subject = |fields: &[&str]| {
        fields
            .iter()
            .find_map(|field| text_field(&entry.data, field))
            .unwrap_or("Untitled")
            .to_string()
    };
    let (title, message) = match entry.store_name {
        Collection::Lessons => (
            format!("New Lesson: {}", subject(&["title"])),
            "A new lesson has been added.",
        ),
        Collection::Events => (
            format!("New Event: {}", subject(&["title"])),
            "A new event has been scheduled.",
        ),
        Collection::Flashcards => (
            format!("New Flashcard Set: {}", subject(&["title"])),
            "A new flashcard set has been created.",
        ),
        Collection::Quizzes => (
            format!("New Quiz: {}", subject(&["title"])),
            "A new quiz has been added.",
        ),
        other => (
            format!("{} Updated: {}", other.label(), subject(&["title", "name"])),
            "Catalog data has been updated.",
        ),
    };
    RecentUpdate {
        id: entry.id.unwrap_or_default(),
        title,
        message: message.to_string(),
        timestamp: entry.timestamp.clone(),
        kind: "update".to_string(),
    }
}

fn parsed_time(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The `limit` newest entries, newest first, re-titled.
///
/// Entries sharing a timestamp are ordered by descending id, so the later
/// write still comes first.
pub fn latest(mut entries: Vec<UpdateEntry>, limit: usize) -> Vec<RecentUpdate> {
    entries.sort_by(|a, b| {
        parsed_time(&b.timestamp)
            .cmp(&parsed_time(&a.timestamp))
            .then_with(|| b.id.cmp(&a.id))
    });
    entries.iter().take(limit).map(recent_update).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TS: &str = "2025-02-01T09:00:00.000Z";

    #[test]
    fn test_notification_table() {
        let cases = [
            (Collection::Lessons, UpdateAction::Add, "New Lesson Available"),
            (Collection::Lessons, UpdateAction::Update, "Lesson Updated"),
            (Collection::Events, UpdateAction::Add, "New Event Announced"),
            (Collection::Events, UpdateAction::Update, "Event Details Updated"),
            (Collection::Flashcards, UpdateAction::Add, "New Flashcard Set Available"),
            (Collection::Flashcards, UpdateAction::Update, "Flashcard Set Updated"),
            (Collection::Quizzes, UpdateAction::Add, "New Quiz Available"),
            (Collection::Quizzes, UpdateAction::Update, "Quiz Updated"),
        ];
        let record = json!({"id": "x1", "title": "Midterm"});
        for (collection, action, title) in cases {
            let notification = synthesize_notification(collection, action, &record, TS).unwrap();
            assert_eq!(notification.title, title);
            assert!(!notification.read);
            assert_eq!(notification.related_to.kind, collection.name());
            assert_eq!(notification.related_to.id, "x1");
        }
    }

    #[test]
    fn test_silent_actions_and_collections() {
        let record = json!({"id": "x1"});
        assert!(synthesize_notification(Collection::Lessons, UpdateAction::Delete, &record, TS).is_none());
        assert!(synthesize_notification(Collection::Lessons, UpdateAction::Bulk, &record, TS).is_none());
        assert!(synthesize_notification(Collection::Courses, UpdateAction::Add, &record, TS).is_none());
    }

    #[test]
    fn test_messages_use_record_fields() {
        let event = json!({"id": "e1", "title": "Career Fair"});
        let n = synthesize_notification(Collection::Events, UpdateAction::Add, &event, TS).unwrap();
        assert_eq!(n.message, "A new event \"Career Fair\" has been scheduled.");

        let orphan_lesson = json!({"id": "l1", "title": "T"});
        let n = synthesize_notification(Collection::Lessons, UpdateAction::Add, &orphan_lesson, TS).unwrap();
        assert!(n.message.ends_with("your courses."));
    }

    #[test]
    fn test_should_log() {
        assert!(should_log(Collection::Lessons, UpdateAction::Bulk));
        assert!(!should_log(Collection::Departments, UpdateAction::Bulk));
        assert!(should_log(Collection::Courses, UpdateAction::Add));
        assert!(!should_log(Collection::Notifications, UpdateAction::Update));
    }

    #[test]
    fn test_latest_orders_and_limits() {
        let mut entries = Vec::new();
        for (id, ts) in [(1, "2025-01-01T00:00:00.000Z"), (2, "2025-01-03T00:00:00.000Z"), (3, "2025-01-02T00:00:00.000Z")] {
            let mut entry = log_entry(Collection::Quizzes, UpdateAction::Add, json!({"title": format!("Q{id}")}), ts);
            entry.id = Some(id);
            entries.push(entry);
        }
        let mut tie = log_entry(Collection::Courses, UpdateAction::Update, json!({"name": "Calculus I"}), "2025-01-03T00:00:00.000Z");
        tie.id = Some(4);
        entries.push(tie);

        let feed = latest(entries, 3);
        let ids: Vec<u64> = feed.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![4, 2, 3]);
        assert_eq!(feed[0].title, "Course Updated: Calculus I");
        assert_eq!(feed[1].title, "New Quiz: Q2");
        assert_eq!(feed[1].kind, "update");
    }

    #[test]
    fn test_bulk_entries_are_untitled() {
        let entry = log_entry(Collection::Lessons, UpdateAction::Bulk, JsonValue::Null, TS);
        assert_eq!(recent_update(&entry).title, "New Lesson: Untitled");
    }
}
