//! Document store layer.
//!
//! The session core talks to an abstract per-user document store: point
//! reads, merge-aware writes, and a realtime-ish subscription. Two
//! implementations exist: the Firestore backend used in production and an
//! in-memory store used for tests and offline development.

use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::UserDocument;

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::{MemoryLocalStorage, MemoryStore};

/// Collection names as constants.
pub mod collections {
    /// Per-user documents, keyed by the opaque user identifier.
    pub const USERS: &str = "users";
}

/// Abstract per-user document store.
///
/// `set_document` with `merge = true` only touches the top-level sections
/// present in `doc`; sibling sections written by other feature areas are
/// preserved. Snapshot delivery order is the store's order; consumers do
/// their own staleness filtering.
pub trait DocumentStore: Send + Sync + 'static {
    fn get_document(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<UserDocument>>> + Send;

    fn set_document(
        &self,
        user_id: &str,
        doc: &UserDocument,
        merge: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to document changes. Dropping the watch unsubscribes.
    fn subscribe(&self, user_id: &str) -> DocumentWatch;
}

/// Live subscription to one user document.
///
/// Delivers snapshots in store order. Dropping the watch stops delivery and
/// aborts any backing poll task.
pub struct DocumentWatch {
    rx: mpsc::Receiver<UserDocument>,
    task: Option<JoinHandle<()>>,
}

impl DocumentWatch {
    pub fn new(rx: mpsc::Receiver<UserDocument>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Next snapshot, or `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<UserDocument> {
        self.rx.recv().await
    }
}

impl Drop for DocumentWatch {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Simple synchronous key-value storage, the persistence target for guest
/// (unauthenticated) sessions.
pub trait LocalStorage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Merge the top-level fields of `incoming` into `existing`.
///
/// The in-memory analogue of the server-side field patch: only top-level
/// keys are replaced, which is the merge granularity the document sections
/// rely on.
pub(crate) fn merge_top_level(existing: &mut Value, incoming: Value) {
    match (existing.as_object_mut(), incoming) {
        (Some(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        (_, incoming) => *existing = incoming,
    }
}
