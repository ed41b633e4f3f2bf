// SPDX-License-Identifier: MIT

//! User-created study goals.

use serde::{Deserialize, Serialize};

/// What a goal's progress is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Study,
    Quiz,
    Flashcard,
    Custom,
}

/// Goal target: older documents stored free-form strings, newer ones numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalTarget {
    Number(u32),
    Text(String),
}

impl GoalTarget {
    /// Numeric target, if one can be extracted.
    ///
    /// For text targets this is the first run of digits found anywhere in the
    /// string ("read 20 chapters" -> 20). No digits means no numeric target.
    pub fn as_number(&self) -> Option<u32> {
        match self {
            GoalTarget::Number(n) => Some(*n),
            GoalTarget::Text(s) => first_integer(s),
        }
    }
}

/// A study goal created by the user.
///
/// Owned exclusively by the user's document; stored under the `goals` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub target: GoalTarget,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
}

/// First unsigned integer appearing in `s`, if any.
fn first_integer(s: &str) -> Option<u32> {
    let mut chars = s.char_indices().skip_while(|(_, c)| !c.is_ascii_digit());
    let (start, _) = chars.next()?;
    let end = s[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|off| start + off)
        .unwrap_or(s.len());
    s[start..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_target() {
        assert_eq!(GoalTarget::Number(42).as_number(), Some(42));
    }

    #[test]
    fn test_text_target_first_integer() {
        assert_eq!(
            GoalTarget::Text("read 20 chapters in 3 weeks".into()).as_number(),
            Some(20)
        );
        assert_eq!(GoalTarget::Text("150".into()).as_number(), Some(150));
        assert_eq!(GoalTarget::Text("finish the book".into()).as_number(), None);
    }

    #[test]
    fn test_text_target_overflow_is_no_match() {
        assert_eq!(
            GoalTarget::Text("99999999999999999999 things".into()).as_number(),
            None
        );
    }

    #[test]
    fn test_goal_serde_round_trip() {
        let goal = Goal {
            id: "g1".into(),
            title: "Study streak".into(),
            target: GoalTarget::Number(300),
            goal_type: GoalType::Study,
            completed: false,
            created_at: "2024-03-01T10:00:00Z".into(),
        };
        let json = serde_json::to_string(&goal).unwrap();
        assert!(json.contains("\"type\":\"study\""));
        assert!(json.contains("\"target\":300"));
        let back: Goal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, goal);
    }

    #[test]
    fn test_goal_deserializes_text_target() {
        let json = r#"{"id":"g2","title":"Custom","target":"do 15 reviews",
                       "type":"custom","completed":false,"createdAt":"2024-01-01T00:00:00Z"}"#;
        let goal: Goal = serde_json::from_str(json).unwrap();
        assert_eq!(goal.target.as_number(), Some(15));
    }
}
