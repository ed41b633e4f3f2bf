// SPDX-License-Identifier: MIT

//! Firestore-backed document store.
//!
//! One document per user in the `users` collection. The Firestore listen API
//! needs resume-token bookkeeping that is not worth carrying for a single
//! document, so subscriptions poll at a configurable interval and deliver a
//! snapshot whenever the document actually changed.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::db::{collections, DocumentStore, DocumentWatch};
use crate::error::{Result, SyncError};
use crate::models::UserDocument;

const WATCH_CHANNEL_CAPACITY: usize = 16;

/// Firestore document store client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, poll_interval: Duration) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, poll_interval).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| SyncError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            poll_interval,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, poll_interval: Duration) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // ExternalJwtFunctionSource provides a dummy token without needing a
        // custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            SyncError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            poll_interval,
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| SyncError::Backend("Database not connected (offline mode)".to_string()))
    }
}

/// Update mask of a merge write: the top-level sections present in `doc`.
///
/// Absent sections are skipped during serialization, so the patch happens
/// server-side and never re-asserts sibling sections written concurrently by
/// another task.
fn merge_fields(doc: &UserDocument) -> Result<Vec<String>> {
    let value = serde_json::to_value(doc)?;
    Ok(value
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default())
}

impl DocumentStore for FirestoreStore {
    async fn get_document(&self, user_id: &str) -> Result<Option<UserDocument>> {
        let result = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| SyncError::classify_backend(e.to_string()));

        match result {
            Ok(doc) => Ok(doc),
            // A missing document is "no data yet", not a failure.
            Err(SyncError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_document(&self, user_id: &str, doc: &UserDocument, merge: bool) -> Result<()> {
        let client = self.get_client()?;

        if merge {
            let fields = merge_fields(doc)?;
            let _: () = client
                .fluent()
                .update()
                .fields(fields)
                .in_col(collections::USERS)
                .document_id(user_id)
                .object(doc)
                .execute()
                .await
                .map_err(|e| SyncError::classify_backend(e.to_string()))?;
        } else {
            let _: () = client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(user_id)
                .object(doc)
                .execute()
                .await
                .map_err(|e| SyncError::classify_backend(e.to_string()))?;
        }
        Ok(())
    }

    fn subscribe(&self, user_id: &str) -> DocumentWatch {
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let store = self.clone();
        let user_id = user_id.to_string();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<UserDocument> = None;

            loop {
                interval.tick().await;
                match store.get_document(&user_id).await {
                    Ok(Some(doc)) => {
                        if last.as_ref() != Some(&doc) {
                            last = Some(doc.clone());
                            if tx.send(doc).await.is_err() {
                                break; // watch dropped
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) if e.is_soft() => {
                        tracing::warn!(user_id = %user_id, error = %e, "Watch poll degraded");
                    }
                    Err(e) => {
                        tracing::warn!(user_id = %user_id, error = %e, "Watch poll failed");
                    }
                }
            }
        });

        DocumentWatch::new(rx, Some(task))
    }
}
