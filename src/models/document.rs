// SPDX-License-Identifier: MIT

//! The per-user backing document.
//!
//! Each feature area owns an independent top-level section so merge-writes
//! from concurrent writers (metrics store, chat store, goals UI) never
//! clobber each other's fields. Absent sections are omitted from
//! serialization, which is what makes a partial `UserDocument` a merge
//! payload.

use serde::{Deserialize, Serialize};

use crate::models::{ChatTranscript, Goal, Notification, StudyMetrics, UserProfile};

/// One user's document in the remote store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_metrics: Option<StudyMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<Goal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<Notification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_chat: Option<ChatTranscript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// Last write timestamp (RFC 3339). Assigned on write, excluded from
    /// round-trip comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserDocument {
    /// Full default shape written when a user's document does not exist yet.
    pub fn seed(profile: UserProfile) -> Self {
        Self {
            study_metrics: Some(StudyMetrics::default()),
            goals: Some(Vec::new()),
            notifications: Some(Vec::new()),
            ai_chat: Some(ChatTranscript::default()),
            profile: Some(profile),
            updated_at: None,
        }
    }

    /// Merge payload carrying only the metrics section.
    pub fn with_metrics(metrics: StudyMetrics, now: &str) -> Self {
        Self {
            study_metrics: Some(metrics),
            updated_at: Some(now.to_string()),
            ..Self::default()
        }
    }

    /// Merge payload carrying only the chat section.
    pub fn with_chat(transcript: ChatTranscript, now: &str) -> Self {
        Self {
            ai_chat: Some(transcript),
            updated_at: Some(now.to_string()),
            ..Self::default()
        }
    }
}
