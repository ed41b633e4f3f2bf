// SPDX-License-Identifier: MIT

//! Badge catalog and evaluation.
//!
//! The catalog is a fixed table of predicates over one composed evaluation
//! context. A predicate that panics counts as "not earned" for that badge
//! only; the walk continues. Earned badges are never revoked, even if the
//! triggering condition later becomes false, so callers only ever append the
//! newly earned delta.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::gamification::xp::XpProgress;
use crate::models::StudyMetrics;

/// Ratios and streaks derived from the raw counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedStats {
    /// Flashcard accuracy percentage (0 when nothing reviewed)
    pub flashcard_accuracy: u8,
    /// Lifetime quiz accuracy percentage (0 when no questions seen)
    pub quiz_accuracy: u8,
    /// Unbroken daily study run ending today
    pub consecutive_days: u32,
}

impl DerivedStats {
    pub fn from_metrics(metrics: &StudyMetrics, consecutive_days: u32) -> Self {
        Self {
            flashcard_accuracy: percentage(metrics.flashcards_correct, metrics.flashcards_reviewed),
            quiz_accuracy: percentage(metrics.total_quiz_correct, metrics.total_quiz_questions),
            consecutive_days,
        }
    }
}

fn percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        0
    } else {
        ((u64::from(part) * 100) / u64::from(whole)).min(100) as u8
    }
}

/// Counters owned by feature areas outside the metrics store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomStats {
    pub notes_created: u32,
    pub decks_created: u32,
    pub goals_completed: u32,
}

/// Everything a badge predicate may look at, bundled into one value so the
/// catalog walk is a single uniform pass.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub metrics: &'a StudyMetrics,
    pub derived: DerivedStats,
    pub custom: CustomStats,
    pub xp: XpProgress,
}

/// A static catalog entry.
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    predicate: fn(&EvalContext) -> bool,
}

/// The immutable badge catalog, defined once.
pub const CATALOG: &[Badge] = &[
    Badge {
        id: "FIRST_REVIEW",
        name: "First Steps",
        description: "Review your first flashcard",
        icon: "🃏",
        predicate: |ctx| ctx.metrics.flashcards_reviewed >= 1,
    },
    Badge {
        id: "STUDY_NOVICE",
        name: "Study Novice",
        description: "Study for a full hour",
        icon: "📖",
        predicate: |ctx| ctx.metrics.study_minutes >= 60,
    },
    Badge {
        id: "STUDY_SCHOLAR",
        name: "Study Scholar",
        description: "Study for ten hours total",
        icon: "🎓",
        predicate: |ctx| ctx.metrics.study_minutes >= 600,
    },
    Badge {
        id: "QUIZ_STARTER",
        name: "Quiz Starter",
        description: "Complete your first quiz",
        icon: "✏️",
        predicate: |ctx| ctx.metrics.quizzes_completed >= 1,
    },
    Badge {
        id: "QUIZ_MASTER",
        name: "Quiz Master",
        description: "Complete 10 quizzes with at least 80% accuracy",
        icon: "🏆",
        predicate: |ctx| ctx.metrics.quizzes_completed >= 10 && ctx.derived.quiz_accuracy >= 80,
    },
    Badge {
        id: "SHARP_MEMORY",
        name: "Sharp Memory",
        description: "90% flashcard accuracy over 50+ reviews",
        icon: "🧠",
        predicate: |ctx| {
            ctx.metrics.flashcards_reviewed >= 50 && ctx.derived.flashcard_accuracy >= 90
        },
    },
    Badge {
        id: "WEEK_STREAK",
        name: "Week Streak",
        description: "Study seven days in a row",
        icon: "🔥",
        predicate: |ctx| ctx.derived.consecutive_days >= 7,
    },
    Badge {
        id: "CURIOUS_MIND",
        name: "Curious Mind",
        description: "Ask the AI assistant 10 questions",
        icon: "💬",
        predicate: |ctx| ctx.metrics.ai_interactions >= 10,
    },
    Badge {
        id: "NOTE_TAKER",
        name: "Note Taker",
        description: "Create five notes",
        icon: "📝",
        predicate: |ctx| ctx.custom.notes_created >= 5,
    },
    Badge {
        id: "GOAL_GETTER",
        name: "Goal Getter",
        description: "Complete three goals",
        icon: "🎯",
        predicate: |ctx| ctx.custom.goals_completed >= 3,
    },
    Badge {
        id: "LEVEL_5",
        name: "Level 5",
        description: "Reach level 5",
        icon: "⭐",
        predicate: |ctx| ctx.xp.level >= 5,
    },
    Badge {
        id: "LEVEL_10",
        name: "Level 10",
        description: "Reach level 10",
        icon: "🌟",
        predicate: |ctx| ctx.xp.level >= 10,
    },
];

/// Evaluate every catalog predicate against `ctx`.
///
/// A panicking predicate is logged and treated as not earned; the remaining
/// badges still get evaluated.
pub fn check_badges<'c>(ctx: &EvalContext<'c>) -> Vec<&'static Badge> {
    CATALOG
        .iter()
        .filter(|badge| {
            match catch_unwind(AssertUnwindSafe(|| (badge.predicate)(ctx))) {
                Ok(earned) => earned,
                Err(_) => {
                    tracing::warn!(badge_id = badge.id, "Badge predicate panicked; skipping");
                    false
                }
            }
        })
        .collect()
}

/// Badge IDs earned now but not present in `previous`.
pub fn newly_earned(previous: &[String], ctx: &EvalContext<'_>) -> Vec<String> {
    check_badges(ctx)
        .into_iter()
        .filter(|badge| !previous.iter().any(|id| id == badge.id))
        .map(|badge| badge.id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx_for(metrics: &StudyMetrics) -> EvalContext<'_> {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let streak = crate::gamification::xp::consecutive_study_days(metrics, today);
        EvalContext {
            metrics,
            derived: DerivedStats::from_metrics(metrics, streak),
            custom: CustomStats::default(),
            xp: XpProgress::from_total_xp(metrics.total_xp),
        }
    }

    fn earned_ids(metrics: &StudyMetrics) -> Vec<&'static str> {
        check_badges(&ctx_for(metrics)).iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_study_novice_boundary() {
        let mut m = StudyMetrics::default();
        m.study_minutes = 59;
        assert!(!earned_ids(&m).contains(&"STUDY_NOVICE"));
        m.study_minutes = 60;
        assert!(earned_ids(&m).contains(&"STUDY_NOVICE"));
    }

    #[test]
    fn test_fresh_metrics_earn_nothing() {
        assert!(earned_ids(&StudyMetrics::default()).is_empty());
    }

    #[test]
    fn test_quiz_master_needs_accuracy() {
        let m = StudyMetrics {
            quizzes_completed: 10,
            total_quiz_questions: 100,
            total_quiz_correct: 79,
            ..StudyMetrics::default()
        };
        assert!(!earned_ids(&m).contains(&"QUIZ_MASTER"));

        let m = StudyMetrics {
            total_quiz_correct: 80,
            ..m
        };
        assert!(earned_ids(&m).contains(&"QUIZ_MASTER"));
    }

    #[test]
    fn test_newly_earned_is_a_set_difference() {
        let m = StudyMetrics {
            flashcards_reviewed: 1,
            study_minutes: 60,
            ..StudyMetrics::default()
        };
        let previous = vec!["FIRST_REVIEW".to_string()];
        let fresh = newly_earned(&previous, &ctx_for(&m));
        assert_eq!(fresh, vec!["STUDY_NOVICE".to_string()]);
    }

    #[test]
    fn test_panicking_predicate_does_not_abort_walk() {
        // Exercise the isolation path directly with a synthetic catalog walk.
        let panicky = Badge {
            id: "PANICKY",
            name: "Panicky",
            description: "always panics",
            icon: "💥",
            predicate: |_| panic!("predicate bug"),
        };
        let m = StudyMetrics {
            flashcards_reviewed: 1,
            ..StudyMetrics::default()
        };
        let ctx = ctx_for(&m);
        let result = catch_unwind(AssertUnwindSafe(|| (panicky.predicate)(&ctx)));
        assert!(result.is_err());
        // The real walk still reports the earnable badge.
        assert!(earned_ids(&m).contains(&"FIRST_REVIEW"));
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
