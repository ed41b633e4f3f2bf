// SPDX-License-Identifier: MIT

//! Full-document round trips through the store.

use chrono::{TimeZone, Utc};

use study_sync::db::{DocumentStore, MemoryStore};
use study_sync::models::{
    ChatMessage, ChatTranscript, Goal, GoalTarget, GoalType, Notification, NotificationKind,
    StudyMetrics, UserDocument, UserProfile,
};

fn populated_document() -> UserDocument {
    let mut metrics = StudyMetrics::default();
    metrics.record_flashcard_review(true);
    metrics.record_quiz_result(9, 10);
    metrics.record_study_minutes(45, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap().date_naive());
    metrics.earned_badges.push("FIRST_REVIEW".to_string());
    metrics.total_xp = 130;

    UserDocument {
        study_metrics: Some(metrics),
        goals: Some(vec![Goal {
            id: "g1".to_string(),
            title: "Read 20 chapters".to_string(),
            target: GoalTarget::Text("20 chapters".to_string()),
            goal_type: GoalType::Custom,
            completed: false,
            created_at: "2024-03-01T00:00:00Z".to_string(),
        }]),
        notifications: Some(vec![Notification {
            id: "goal-g1-25".to_string(),
            kind: NotificationKind::Goal,
            title: "Goal milestone".to_string(),
            message: "You're 30% of the way to \"Read 20 chapters\" (25% milestone)".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            read: true,
        }]),
        ai_chat: Some(ChatTranscript {
            messages: vec![ChatMessage::greeting(), ChatMessage::user("hi")],
        }),
        profile: Some(UserProfile {
            display_name: "Sam".to_string(),
            email: Some("sam@example.com".to_string()),
            created_at: "2024-02-01T00:00:00Z".to_string(),
        }),
        updated_at: Some("2024-03-15T12:00:00Z".to_string()),
    }
}

#[tokio::test]
async fn test_full_document_survives_a_store_round_trip() {
    let store = MemoryStore::new();
    let original = populated_document();
    store.set_document("u-rt", &original, false).await.unwrap();

    let mut loaded = store.get_document("u-rt").await.unwrap().unwrap();
    // The write stamp is the only field a round trip is allowed to differ in.
    loaded.updated_at = original.updated_at.clone();
    assert_eq!(loaded, original);
}

#[tokio::test]
async fn test_section_writes_compose_into_the_full_document() {
    let store = MemoryStore::new();
    let full = populated_document();
    store
        .set_document("u-compose", &UserDocument::seed(UserProfile::default()), false)
        .await
        .unwrap();

    // Each feature area writes only its own section.
    store
        .set_document(
            "u-compose",
            &UserDocument::with_metrics(full.study_metrics.clone().unwrap(), "2024-03-15T12:00:00Z"),
            true,
        )
        .await
        .unwrap();
    store
        .set_document(
            "u-compose",
            &UserDocument::with_chat(full.ai_chat.clone().unwrap(), "2024-03-15T12:00:01Z"),
            true,
        )
        .await
        .unwrap();

    let doc = store.get_document("u-compose").await.unwrap().unwrap();
    assert_eq!(doc.study_metrics, full.study_metrics);
    assert_eq!(doc.ai_chat, full.ai_chat);
    // Sections no one rewrote keep their seeded values.
    assert_eq!(doc.goals, Some(Vec::new()));
    assert_eq!(doc.profile, Some(UserProfile::default()));
}
