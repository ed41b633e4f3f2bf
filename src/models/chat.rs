// SPDX-License-Identifier: MIT

//! Chat transcript types for the AI assistant sidebar.

use serde::{Deserialize, Serialize};

/// Opening message shown before the user has said anything.
///
/// Synthetic: it is replaced (once) by the stored transcript when a
/// non-empty one is loaded, and a transcript containing only this message
/// is never persisted.
pub const GREETING: &str =
    "Hi! I'm your study assistant. Ask me anything about what you're working on.";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the ordered, append-only chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// The synthetic initial greeting.
    pub fn greeting() -> Self {
        Self::assistant(GREETING)
    }
}

/// Persisted form of the transcript (the `aiChat` document section).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTranscript {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn test_greeting_is_assistant_role() {
        let g = ChatMessage::greeting();
        assert_eq!(g.role, Role::Assistant);
        assert_eq!(g.content, GREETING);
    }
}
