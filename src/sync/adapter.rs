// SPDX-License-Identifier: MIT

//! Remote sync adapter over the abstract document store.
//!
//! Adds the session-level concerns the raw store does not have: race-free
//! document initialization, graceful degradation on soft failures, and
//! merge-only section writes.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::{DocumentStore, DocumentWatch};
use crate::error::{Result, SyncError};
use crate::models::UserDocument;

/// Session-facing wrapper around a [`DocumentStore`].
pub struct RemoteSyncAdapter<S> {
    store: Arc<S>,
    /// Per-user initialization locks so concurrent initialize calls for the
    /// same nonexistent document cannot race into duplicate/partial writes.
    init_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: DocumentStore> RemoteSyncAdapter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            init_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create the backing document with the full default shape iff it does
    /// not exist. A no-op when the document is already there.
    pub async fn initialize(&self, user_id: &str, seed: &UserDocument) -> Result<()> {
        let lock = self
            .init_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        match self.store.get_document(user_id).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                tracing::info!(user_id, "Seeding user document");
                self.store.set_document(user_id, seed, false).await
            }
            Err(e) if e.is_soft() => {
                // Cannot tell whether the document exists; do not risk
                // clobbering it.
                tracing::warn!(user_id, error = %e, "Initialize degraded; skipping seed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort read of the full document.
    ///
    /// Not-found means "no data yet"; permission and quota failures degrade
    /// to an empty result so callers can proceed with defaults.
    pub async fn read(&self, user_id: &str) -> Result<Option<UserDocument>> {
        match self.store.get_document(user_id).await {
            Ok(doc) => Ok(doc),
            Err(SyncError::NotFound(_)) => Ok(None),
            Err(e) if e.is_soft() => {
                tracing::warn!(user_id, error = %e, "Read degraded to empty");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Merge-write the sections present in `partial`. Sibling sections are
    /// left untouched.
    pub async fn write_section(&self, user_id: &str, partial: &UserDocument) -> Result<()> {
        self.store.set_document(user_id, partial, true).await
    }

    /// Subscribe to the user's document. Dropping the watch unsubscribes.
    pub fn subscribe(&self, user_id: &str) -> DocumentWatch {
        self.store.subscribe(user_id)
    }
}
