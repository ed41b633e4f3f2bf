// SPDX-License-Identifier: MIT

//! Goal milestone notifications.
//!
//! Pure derivation: given the goal list, current metrics, and the last known
//! progress per goal, emit one notification per milestone threshold crossed
//! since the previous derivation. Notification IDs are stable composites of
//! goal id and threshold, so regenerating after a restart does not duplicate
//! entries as long as the previous-progress map survives. Without that map
//! (cold start) crossing detection resets and already-seen milestones may
//! re-emit; that is a known, accepted limitation rather than something this
//! module papers over.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{Goal, GoalType, Notification, NotificationKind, StudyMetrics};

/// Progress thresholds that trigger a notification, in percent.
pub const MILESTONES: [u32; 4] = [25, 50, 75, 100];

/// Default targets when a goal has no usable numeric target.
pub const DEFAULT_STUDY_TARGET: u32 = 300;
pub const DEFAULT_QUIZ_TARGET: u32 = 10;
pub const DEFAULT_FLASHCARD_TARGET: u32 = 50;

/// Percentage progress toward one goal, capped at 100.
///
/// Returns `None` for a custom goal whose target string contains no number;
/// such goals are skipped entirely.
pub fn goal_progress(goal: &Goal, metrics: &StudyMetrics) -> Option<u32> {
    let (current, target) = match goal.goal_type {
        GoalType::Study => (
            metrics.study_minutes,
            goal.target.as_number().unwrap_or(DEFAULT_STUDY_TARGET),
        ),
        GoalType::Quiz => (
            metrics.quizzes_completed,
            goal.target.as_number().unwrap_or(DEFAULT_QUIZ_TARGET),
        ),
        GoalType::Flashcard => (
            metrics.flashcards_reviewed,
            goal.target.as_number().unwrap_or(DEFAULT_FLASHCARD_TARGET),
        ),
        GoalType::Custom => (
            metrics.flashcards_reviewed + metrics.quizzes_completed * 5,
            goal.target.as_number()?,
        ),
    };
    if target == 0 {
        return None;
    }
    let pct = (f64::from(current) / f64::from(target) * 100.0).round() as u32;
    Some(pct.min(100))
}

/// Derive milestone notifications for all goals.
///
/// Returns the new notifications plus the updated progress-by-goal map to
/// feed back into the next derivation. Completed goals are skipped entirely.
/// Calling twice with identical inputs yields nothing the second time.
pub fn derive_goal_notifications(
    goals: &[Goal],
    metrics: &StudyMetrics,
    previous_progress: &HashMap<String, u32>,
    now: DateTime<Utc>,
) -> (Vec<Notification>, HashMap<String, u32>) {
    let mut notifications = Vec::new();
    let mut updated = previous_progress.clone();

    for goal in goals {
        if goal.completed {
            continue;
        }
        let Some(progress) = goal_progress(goal, metrics) else {
            continue;
        };
        let last_known = previous_progress.get(&goal.id).copied().unwrap_or(0);

        for threshold in MILESTONES {
            if last_known < threshold && threshold <= progress {
                notifications.push(milestone_notification(goal, threshold, progress, now));
            }
        }
        updated.insert(goal.id.clone(), progress);
    }

    (notifications, updated)
}

fn milestone_notification(
    goal: &Goal,
    threshold: u32,
    progress: u32,
    now: DateTime<Utc>,
) -> Notification {
    let (title, message) = if threshold == 100 {
        (
            "Goal reached!".to_string(),
            format!("You hit your goal \"{}\". Nice work!", goal.title),
        )
    } else {
        (
            "Goal milestone".to_string(),
            format!(
                "You're {}% of the way to \"{}\" ({}% milestone)",
                progress, goal.title, threshold
            ),
        )
    };
    Notification {
        // Stable composite id: regenerating the same crossing is idempotent.
        id: format!("goal-{}-{}", goal.id, threshold),
        kind: NotificationKind::Goal,
        title,
        message,
        created_at: now,
        read: false,
    }
}
