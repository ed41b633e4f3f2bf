// SPDX-License-Identifier: MIT

//! Chat session store: the debounced-sync pattern applied to the AI chat
//! transcript.
//!
//! Two differences from the metrics store:
//! - While a completion request is outstanding, every incoming remote
//!   snapshot is ignored unconditionally. The in-flight flag takes priority
//!   over the echo gate, so a snapshot that predates the assistant reply can
//!   never shrink the optimistic transcript.
//! - Guest (unauthenticated) sessions persist to local key-value storage
//!   with the same debounce shape and no echo concern.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::ai::{AiClient, AiError};
use crate::config::Config;
use crate::db::{DocumentStore, LocalStorage};
use crate::error::SyncError;
use crate::models::{ChatMessage, ChatTranscript, UserDocument, UserIdentity};
use crate::sync::adapter::RemoteSyncAdapter;
use crate::sync::policy::{SnapshotDecision, WritePolicy};

/// Local-storage key holding a guest's transcript.
pub const CHAT_STORAGE_KEY: &str = "studySync.aiChat";

struct ChatState {
    identity: Option<UserIdentity>,
    messages: Vec<ChatMessage>,
    /// A completion request is outstanding; remote snapshots are ignored.
    in_flight: bool,
    /// Persist even a greeting-only transcript (set by `clear`).
    force_persist: bool,
    policy: WritePolicy,
    epoch: u64,
}

struct Shared {
    state: Mutex<ChatState>,
    wake: Notify,
}

/// Synchronized chat transcript for one session.
pub struct ChatStore<S, L> {
    shared: Arc<Shared>,
    adapter: Arc<RemoteSyncAdapter<S>>,
    local: Arc<L>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: DocumentStore, L: LocalStorage> ChatStore<S, L> {
    pub fn new(
        adapter: Arc<RemoteSyncAdapter<S>>,
        local: Arc<L>,
        config: &Config,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ChatState {
                    identity: None,
                    messages: vec![ChatMessage::greeting()],
                    in_flight: false,
                    force_persist: false,
                    policy: WritePolicy::new(config.write_debounce, config.echo_window),
                    epoch: 0,
                }),
                wake: Notify::new(),
            }),
            adapter,
            local,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Switch identity. `None` starts a guest session backed by local
    /// storage; `Some` binds the transcript to the user's remote document.
    pub async fn set_identity(&self, identity: Option<UserIdentity>) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }

        let epoch = {
            let mut st = self.shared.state.lock().unwrap();
            st.messages = vec![ChatMessage::greeting()];
            st.in_flight = false;
            st.force_persist = false;
            st.policy.reset();
            st.identity = identity.clone();
            st.epoch += 1;
            st.epoch
        };

        match identity {
            None => {
                // Guest: restore any locally saved transcript, then persist
                // locally with the same debounce shape.
                if let Some(raw) = self.local.get(CHAT_STORAGE_KEY) {
                    match serde_json::from_str::<ChatTranscript>(&raw) {
                        Ok(saved) if !saved.messages.is_empty() => {
                            let mut st = self.shared.state.lock().unwrap();
                            if st.epoch == epoch {
                                st.messages = saved.messages;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Discarding unreadable local transcript");
                            self.local.remove(CHAT_STORAGE_KEY);
                        }
                    }
                }
                let task = tokio::spawn(local_flush_loop(
                    self.shared.clone(),
                    self.local.clone(),
                    epoch,
                ));
                *self.tasks.lock().unwrap() = vec![task];
            }
            Some(identity) => {
                let user_id = identity.user_id;
                match self.adapter.read(&user_id).await {
                    Ok(Some(doc)) => apply_snapshot(&self.shared, doc, epoch),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(user_id = %user_id, error = %e, "Initial chat read failed")
                    }
                }

                let mut watch = self.adapter.subscribe(&user_id);
                let shared = self.shared.clone();
                let watch_task = tokio::spawn(async move {
                    while let Some(doc) = watch.next().await {
                        apply_snapshot(&shared, doc, epoch);
                    }
                });
                let flush_task = tokio::spawn(remote_flush_loop(
                    self.shared.clone(),
                    self.adapter.clone(),
                    user_id,
                    epoch,
                ));
                *self.tasks.lock().unwrap() = vec![watch_task, flush_task];
            }
        }
    }

    /// Current transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.state.lock().unwrap().messages.clone()
    }

    /// True while a completion request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.shared.state.lock().unwrap().in_flight
    }

    /// Send a user message and ask the AI collaborator for a reply.
    ///
    /// The user message is appended optimistically before the request goes
    /// out. On failure the error is never dropped silently: a categorized,
    /// user-readable assistant message lands in the transcript instead.
    pub async fn send_message<A: AiClient>(&self, content: &str, ai: &A) -> ChatMessage {
        let (history, epoch) = {
            let mut st = self.shared.state.lock().unwrap();
            st.messages.push(ChatMessage::user(content));
            st.in_flight = true;
            st.policy.mutated(Instant::now());
            (st.messages.clone(), st.epoch)
        };
        self.shared.wake.notify_one();

        let reply = match ai.complete(&history).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!("AI returned an empty completion");
                ChatMessage::assistant(AiError::EmptyResponse.user_message())
            }
            Ok(text) => ChatMessage::assistant(text),
            Err(e) => {
                tracing::warn!(error = %e, "AI completion failed");
                ChatMessage::assistant(e.user_message())
            }
        };

        {
            let mut st = self.shared.state.lock().unwrap();
            if st.epoch != epoch {
                // Identity changed while the request was in flight; the
                // reply belongs to the previous session.
                return reply;
            }
            st.messages.push(reply.clone());
            st.in_flight = false;
            st.policy.mutated(Instant::now());
        }
        self.shared.wake.notify_one();
        reply
    }

    /// Reset the transcript to the greeting and persist the cleared state.
    pub fn clear(&self) {
        {
            let mut st = self.shared.state.lock().unwrap();
            st.messages = vec![ChatMessage::greeting()];
            st.force_persist = true;
            st.policy.mutated(Instant::now());
        }
        self.shared.wake.notify_one();
    }
}

impl<S, L> Drop for ChatStore<S, L> {
    fn drop(&mut self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

/// Apply one incoming remote snapshot, unless a completion is in flight.
fn apply_snapshot(shared: &Shared, doc: UserDocument, epoch: u64) {
    let now = Instant::now();
    let mut st = shared.state.lock().unwrap();
    if st.epoch != epoch {
        return;
    }
    if st.in_flight {
        tracing::debug!("Chat snapshot ignored: completion in flight");
        return;
    }
    match st.policy.snapshot_decision(now) {
        SnapshotDecision::DiscardEcho => {
            tracing::debug!("Chat snapshot discarded as echo");
        }
        SnapshotDecision::ApplyInitial | SnapshotDecision::Apply => {
            if let Some(transcript) = doc.ai_chat {
                // The greeting is synthetic; only a non-empty stored
                // transcript replaces it.
                if !transcript.messages.is_empty() {
                    st.messages = transcript.messages;
                }
            }
        }
    }
}

/// Whether the transcript is worth persisting.
fn should_persist(st: &ChatState) -> bool {
    st.force_persist || st.messages.len() > 1
}

async fn remote_flush_loop<S: DocumentStore>(
    shared: Arc<Shared>,
    adapter: Arc<RemoteSyncAdapter<S>>,
    user_id: String,
    epoch: u64,
) {
    loop {
        let deadline = {
            let st = shared.state.lock().unwrap();
            if st.epoch != epoch {
                return;
            }
            st.policy.next_deadline()
        };
        let Some(deadline) = deadline else {
            shared.wake.notified().await;
            continue;
        };
        tokio::select! {
            _ = shared.wake.notified() => continue,
            _ = tokio::time::sleep_until(deadline) => {}
        }

        let now = Instant::now();
        let payload = {
            let mut st = shared.state.lock().unwrap();
            if st.epoch != epoch {
                return;
            }
            if !st.policy.begin_write(now) {
                continue;
            }
            if !should_persist(&st) {
                st.policy.write_skipped(now);
                continue;
            }
            ChatTranscript {
                messages: st.messages.clone(),
            }
        };

        let stamp = Utc::now().to_rfc3339();
        let doc = UserDocument::with_chat(payload, &stamp);
        let result = adapter.write_section(&user_id, &doc).await;

        let now = Instant::now();
        let mut st = shared.state.lock().unwrap();
        if st.epoch != epoch {
            return;
        }
        match result {
            Ok(()) => {
                st.force_persist = false;
                st.policy.write_completed(now);
                tracing::debug!(user_id = %user_id, "Transcript flushed");
            }
            Err(SyncError::QuotaExhausted(msg)) => {
                tracing::warn!(user_id = %user_id, detail = %msg, "Transcript flush hit quota");
                st.policy.write_completed(now);
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Transcript flush failed");
                st.policy.write_failed(now);
            }
        }
    }
}

async fn local_flush_loop<L: LocalStorage>(shared: Arc<Shared>, local: Arc<L>, epoch: u64) {
    loop {
        let deadline = {
            let st = shared.state.lock().unwrap();
            if st.epoch != epoch {
                return;
            }
            st.policy.next_deadline()
        };
        let Some(deadline) = deadline else {
            shared.wake.notified().await;
            continue;
        };
        tokio::select! {
            _ = shared.wake.notified() => continue,
            _ = tokio::time::sleep_until(deadline) => {}
        }

        let now = Instant::now();
        let mut st = shared.state.lock().unwrap();
        if st.epoch != epoch {
            return;
        }
        if !st.policy.begin_write(now) {
            continue;
        }
        if !should_persist(&st) {
            st.policy.write_skipped(now);
            continue;
        }
        let transcript = ChatTranscript {
            messages: st.messages.clone(),
        };
        match serde_json::to_string(&transcript) {
            Ok(raw) => {
                local.set(CHAT_STORAGE_KEY, raw);
                st.force_persist = false;
                st.policy.write_completed(now);
                tracing::debug!("Guest transcript saved locally");
            }
            Err(e) => {
                tracing::error!(error = %e, "Guest transcript serialization failed");
                st.policy.write_failed(now);
            }
        }
    }
}
