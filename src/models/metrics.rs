//! Study activity counters and the per-user metrics aggregate.
//!
//! `StudyMetrics` is the singleton metrics section of a user's document.
//! Counters only grow under normal operation; `total_xp` is derived from
//! the counters and recomputed on every change rather than mutated directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregated study metrics for one user.
///
/// Stored under the `studyMetrics` section of the user document. Field names
/// are camelCase because the stored format predates this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyMetrics {
    /// Total flashcards reviewed (correct or not)
    pub flashcards_reviewed: u32,
    /// Flashcards answered correctly
    pub flashcards_correct: u32,
    /// Quizzes completed
    pub quizzes_completed: u32,
    /// Questions seen across all quizzes
    pub total_quiz_questions: u32,
    /// Questions answered correctly across all quizzes
    pub total_quiz_correct: u32,
    /// AI assistant interactions
    pub ai_interactions: u32,
    /// Total study time in minutes
    pub study_minutes: u32,

    /// Minutes studied per calendar day ("YYYY-MM-DD" keys)
    pub daily_study_time: HashMap<String, u32>,

    /// Badge IDs earned so far (append-only; never revoked)
    pub earned_badges: Vec<String>,

    /// Derived XP total, recomputed from the counters
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
}

impl Default for StudyMetrics {
    fn default() -> Self {
        Self {
            flashcards_reviewed: 0,
            flashcards_correct: 0,
            quizzes_completed: 0,
            total_quiz_questions: 0,
            total_quiz_correct: 0,
            ai_interactions: 0,
            study_minutes: 0,
            daily_study_time: HashMap::new(),
            earned_badges: Vec::new(),
            total_xp: 0,
        }
    }
}

impl StudyMetrics {
    /// True when every counter is still at its default zero.
    ///
    /// Used to skip persisting a no-op initial state.
    pub fn is_default(&self) -> bool {
        self.flashcards_reviewed == 0
            && self.flashcards_correct == 0
            && self.quizzes_completed == 0
            && self.total_quiz_questions == 0
            && self.total_quiz_correct == 0
            && self.ai_interactions == 0
            && self.study_minutes == 0
            && self.daily_study_time.is_empty()
            && self.earned_badges.is_empty()
    }

    /// Record one flashcard review.
    pub fn record_flashcard_review(&mut self, correct: bool) {
        self.flashcards_reviewed += 1;
        if correct {
            self.flashcards_correct += 1;
        }
    }

    /// Record a completed quiz with its score.
    pub fn record_quiz_result(&mut self, correct: u32, total: u32) {
        self.quizzes_completed += 1;
        self.total_quiz_questions += total;
        self.total_quiz_correct += correct.min(total);
    }

    /// Record one AI assistant interaction.
    pub fn record_ai_interaction(&mut self) {
        self.ai_interactions += 1;
    }

    /// Record study time, attributed to `today` for streak tracking.
    pub fn record_study_minutes(&mut self, minutes: u32, today: NaiveDate) {
        self.study_minutes += minutes;
        *self
            .daily_study_time
            .entry(date_key(today))
            .or_insert(0) += minutes;
    }
}

/// Calendar-day key used in `daily_study_time`.
pub fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
