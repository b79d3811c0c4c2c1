//! Free-text search across the catalog.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::acad_store::AcadStore;
use crate::collection::Collection;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Department,
    Course,
    Lesson,
    Event,
}

impl SearchKind {
    /// Search order, with the collection and the fields matched in each.
    const SCOPES: [(SearchKind, Collection, &'static [&'static str]); 4] = [
        (SearchKind::Department, Collection::Departments, &["name", "code"]),
        (SearchKind::Course, Collection::Courses, &["name", "code", "description"]),
        (SearchKind::Lesson, Collection::Lessons, &["title", "content"]),
        (SearchKind::Event, Collection::Events, &["title", "description"]),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub kind: SearchKind,
    pub record: JsonValue,
}

impl AcadStore {
    /// Case-insensitive substring search. Hits are grouped by kind:
    /// departments, courses, lessons, then events. A blank query finds
    /// nothing.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, StoreError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for (kind, collection, fields) in SearchKind::SCOPES {
            for record in self.get_all(collection)? {
                if matches(&record, fields, &needle) {
                    hits.push(SearchHit { kind, record });
                }
            }
        }
        Ok(hits)
    }
}

fn matches(record: &JsonValue, fields: &[&str], needle: &str) -> bool {
    fields.iter().any(|field| {
        record
            .get(*field)
            .and_then(JsonValue::as_str)
            .is_some_and(|text| text.to_lowercase().contains(needle))
    })
}
