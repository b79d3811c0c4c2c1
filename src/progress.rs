//! Per-student progress: lessons opened and quiz attempts.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::local_storage::{LocalStorage, QUIZ_ATTEMPTS_KEY, VIEWED_LESSONS_KEY};
use crate::update_recorder::now_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewedLesson {
    pub id: String,
    pub title: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub total_questions: u32,
    pub timestamp: String,
}

impl QuizAttempt {
    fn percent(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total_questions) * 100.0
        }
    }
}

#[derive(Clone)]
pub struct ProgressTracker {
    storage: LocalStorage,
}

impl ProgressTracker {
    pub fn new(storage: LocalStorage) -> Self {
        ProgressTracker { storage }
    }

    /// Records the first view of a lesson. Later views return `false`.
    pub fn track_lesson_view(&self, lesson_id: &str, title: &str) -> Result<bool, StoreError> {
        let mut viewed = self.viewed_lessons()?;
        if viewed.iter().any(|lesson| lesson.id == lesson_id) {
            return Ok(false);
        }
        viewed.push(ViewedLesson {
            id: lesson_id.to_string(),
            title: title.to_string(),
            timestamp: now_timestamp(),
        });
        self.storage.set_json(VIEWED_LESSONS_KEY, &viewed)?;
        Ok(true)
    }

    pub fn viewed_lessons(&self) -> Result<Vec<ViewedLesson>, StoreError> {
        self.storage.get_list(VIEWED_LESSONS_KEY)
    }

    pub fn record_quiz_attempt(&self, attempt: QuizAttempt) -> Result<(), StoreError> {
        let mut attempts = self.quiz_attempts()?;
        attempts.push(attempt);
        self.storage.set_json(QUIZ_ATTEMPTS_KEY, &attempts)
    }

    pub fn quiz_attempts(&self) -> Result<Vec<QuizAttempt>, StoreError> {
        self.storage.get_list(QUIZ_ATTEMPTS_KEY)
    }

    /// Share of `total_lessons` viewed, as a rounded percentage.
    pub fn overall_progress(&self, total_lessons: usize) -> Result<u8, StoreError> {
        if total_lessons == 0 {
            return Ok(0);
        }
        let viewed = self.viewed_lessons()?.len() as f64;
        let percent = (viewed / total_lessons as f64 * 100.0).round().min(100.0);
        Ok(percent as u8)
    }

    /// Mean score across attempts, as a rounded percentage.
    pub fn average_quiz_score(&self) -> Result<u8, StoreError> {
        let attempts = self.quiz_attempts()?;
        if attempts.is_empty() {
            return Ok(0);
        }
        let total: f64 = attempts.iter().map(QuizAttempt::percent).sum();
        Ok((total / attempts.len() as f64).round().min(100.0) as u8)
    }
}
