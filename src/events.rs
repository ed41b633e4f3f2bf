// SPDX-License-Identifier: MIT

//! Typed session event bus.
//!
//! Cross-cutting signals (badge earned, level up, identity change) flow over
//! an explicit broadcast channel instead of ambient global dispatch. A
//! subscription is a plain receiver handle, dropped on teardown.

use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Cross-cutting events emitted by the session stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BadgeEarned { badge_id: String },
    LevelUp { level: u32 },
    IdentityChanged { user_id: Option<String> },
}

/// Broadcast bus for [`SessionEvent`]s.
///
/// Cheap to clone; all clones share one channel. Emitting never blocks and
/// silently drops events when nothing is subscribed.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Open a subscription. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        // A send error just means no one is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
