// SPDX-License-Identifier: MIT

//! Data models for the session core.

pub mod chat;
pub mod document;
pub mod goal;
pub mod metrics;
pub mod notification;
pub mod profile;

pub use chat::{ChatMessage, ChatTranscript, Role, GREETING};
pub use document::UserDocument;
pub use goal::{Goal, GoalTarget, GoalType};
pub use metrics::{date_key, StudyMetrics};
pub use notification::{merge_notifications, Notification, NotificationKind, NOTIFICATION_CAP};
pub use profile::{UserIdentity, UserProfile};
