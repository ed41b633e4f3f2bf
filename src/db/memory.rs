// SPDX-License-Identifier: MIT

//! In-memory document store and local storage.
//!
//! Backs tests and offline development. Writes notify every live watcher,
//! including the writer's own subscription, which mirrors how the remote
//! store echoes a client's own write back to it.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::db::{merge_top_level, DocumentStore, DocumentWatch, LocalStorage};
use crate::error::{Result, SyncError};
use crate::models::UserDocument;

const WATCH_CHANNEL_CAPACITY: usize = 16;

/// In-memory [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, Value>,
    watchers: DashMap<String, Vec<mpsc::Sender<UserDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn notify_watchers(&self, user_id: &str, doc: &UserDocument) {
        if let Some(mut senders) = self.watchers.get_mut(user_id) {
            senders.retain(|tx| match tx.try_send(doc.clone()) {
                Ok(()) => true,
                // A slow watcher misses this snapshot and catches up on the
                // next write; only a dropped watch unsubscribes.
                Err(mpsc::error::TrySendError::Full(_)) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get_document(&self, user_id: &str) -> Result<Option<UserDocument>> {
        match self.docs.get(user_id) {
            Some(value) => {
                let doc = serde_json::from_value(value.clone())?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn set_document(&self, user_id: &str, doc: &UserDocument, merge: bool) -> Result<()> {
        let incoming = serde_json::to_value(doc)?;
        let merged = {
            let mut entry = self
                .docs
                .entry(user_id.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
            if merge {
                merge_top_level(entry.value_mut(), incoming);
            } else {
                *entry.value_mut() = incoming;
            }
            entry.value().clone()
        };

        let full: UserDocument =
            serde_json::from_value(merged).map_err(SyncError::Serialization)?;
        self.notify_watchers(user_id, &full);
        Ok(())
    }

    fn subscribe(&self, user_id: &str) -> DocumentWatch {
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        self.watchers
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        DocumentWatch::new(rx, None)
    }
}

/// In-memory [`LocalStorage`] for guest sessions in tests.
#[derive(Default)]
pub struct MemoryLocalStorage {
    entries: DashMap<String, String>,
}

impl MemoryLocalStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudyMetrics;

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_document("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_write_preserves_sibling_sections() {
        let store = MemoryStore::new();
        let seed = UserDocument::seed(Default::default());
        store.set_document("u1", &seed, false).await.unwrap();

        let mut metrics = StudyMetrics::default();
        metrics.flashcards_reviewed = 7;
        let partial = UserDocument::with_metrics(metrics.clone(), "2024-03-01T00:00:00Z");
        store.set_document("u1", &partial, true).await.unwrap();

        let doc = store.get_document("u1").await.unwrap().unwrap();
        assert_eq!(doc.study_metrics, Some(metrics));
        assert!(doc.goals.is_some(), "merge clobbered a sibling section");
        assert!(doc.profile.is_some());
    }

    #[tokio::test]
    async fn test_watchers_see_writes_in_order() {
        let store = MemoryStore::new();
        let mut watch = store.subscribe("u1");

        for n in 1..=3u32 {
            let mut metrics = StudyMetrics::default();
            metrics.flashcards_reviewed = n;
            let doc = UserDocument::with_metrics(metrics, "now");
            store.set_document("u1", &doc, true).await.unwrap();
        }

        for n in 1..=3u32 {
            let snapshot = watch.next().await.unwrap();
            assert_eq!(snapshot.study_metrics.unwrap().flashcards_reviewed, n);
        }
    }

    #[tokio::test]
    async fn test_slow_watcher_stays_subscribed_past_a_full_channel() {
        let store = MemoryStore::new();
        let mut watch = store.subscribe("u1");

        // More writes than the watch channel can hold, none consumed yet.
        for n in 1..=(WATCH_CHANNEL_CAPACITY as u32 + 4) {
            let mut metrics = StudyMetrics::default();
            metrics.flashcards_reviewed = n;
            let doc = UserDocument::with_metrics(metrics, "2024-03-01T00:00:00Z");
            store.set_document("u1", &doc, true).await.unwrap();
        }
        for _ in 0..WATCH_CHANNEL_CAPACITY {
            watch.next().await.unwrap();
        }

        // The overflow dropped snapshots, not the subscription.
        let mut metrics = StudyMetrics::default();
        metrics.flashcards_reviewed = 999;
        store
            .set_document(
                "u1",
                &UserDocument::with_metrics(metrics, "2024-03-01T00:00:01Z"),
                true,
            )
            .await
            .unwrap();
        let snapshot = watch.next().await.unwrap();
        assert_eq!(snapshot.study_metrics.unwrap().flashcards_reviewed, 999);
    }

    #[test]
    fn test_local_storage_round_trip() {
        let local = MemoryLocalStorage::new();
        local.set("k", "v".to_string());
        assert_eq!(local.get("k").as_deref(), Some("v"));
        local.remove("k");
        assert!(local.get("k").is_none());
    }
}
