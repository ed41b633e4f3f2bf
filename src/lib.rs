// SPDX-License-Identifier: MIT

//! study-sync: client-side state synchronization and gamification core for a
//! study application.
//!
//! This crate owns the session state between UI views and the per-user
//! remote document: the debounced-write metrics store, the chat session
//! store with its in-flight guard, the pure XP/badge calculator, and the
//! goal milestone notification deriver. Rendering, routing, and the embeds
//! live elsewhere and consume this core.

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod gamification;
pub mod models;
pub mod notify;
pub mod sync;

use std::sync::Arc;

use config::Config;
use db::{DocumentStore, LocalStorage};
use events::{EventBus, SessionEvent};
use models::UserIdentity;
use sync::{ChatStore, MetricsStore, RemoteSyncAdapter};

pub use error::{Result, SyncError};

/// One user session's stores, wired over a shared sync adapter.
///
/// Identity changes fan out to every store; each store resets to defaults
/// before touching the new identity's data.
pub struct SessionCore<S, L> {
    pub config: Config,
    pub events: EventBus,
    pub metrics: MetricsStore<S>,
    pub chat: ChatStore<S, L>,
}

impl<S: DocumentStore, L: LocalStorage> SessionCore<S, L> {
    pub fn new(config: Config, store: Arc<S>, local: Arc<L>) -> Self {
        let adapter = Arc::new(RemoteSyncAdapter::new(store));
        let events = EventBus::new();
        let metrics = MetricsStore::new(adapter.clone(), events.clone(), &config);
        let chat = ChatStore::new(adapter, local, &config);
        Self {
            config,
            events,
            metrics,
            chat,
        }
    }

    /// Bind the session to a new identity (or to a guest session).
    pub async fn set_identity(&self, identity: Option<UserIdentity>) {
        let user_id = identity.as_ref().map(|i| i.user_id.clone());
        tracing::info!(user_id = ?user_id, "Session identity changed");
        self.metrics.set_identity(identity.clone()).await;
        self.chat.set_identity(identity).await;
        self.events.emit(SessionEvent::IdentityChanged { user_id });
    }
}
