// SPDX-License-Identifier: MIT

//! Milestone and system notifications shown in the UI bell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum notifications kept after a merge (most recent win).
pub const NOTIFICATION_CAP: usize = 50;

/// Where a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Goal,
    Tutor,
    Other,
}

/// A single notification entry.
///
/// IDs are stable composites of their source event (e.g. goal id + milestone
/// threshold) so regenerating after a restart does not duplicate entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Merge two notification lists.
///
/// Deduplicates by id (the most recently seen copy of a duplicate wins),
/// sorts by creation time descending, and caps the result at
/// [`NOTIFICATION_CAP`] entries.
pub fn merge_notifications(
    existing: Vec<Notification>,
    incoming: Vec<Notification>,
) -> Vec<Notification> {
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Notification> = Vec::with_capacity(existing.len() + incoming.len());

    for n in existing.into_iter().chain(incoming) {
        match by_id.get(&n.id) {
            Some(&idx) => merged[idx] = n,
            None => {
                by_id.insert(n.id.clone(), merged.len());
                merged.push(n);
            }
        }
    }

    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged.truncate(NOTIFICATION_CAP);
    merged
}
