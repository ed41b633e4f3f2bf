// SPDX-License-Identifier: MIT

//! Metrics store: authoritative in-memory study metrics with debounced
//! persistence and remote-snapshot reconciliation.
//!
//! The workflow per mutation:
//! 1. Apply the counter change in memory (source of truth for the UI).
//! 2. Recompute derived XP and badge state immediately, emitting events for
//!    anything newly earned. This may itself dirty the metrics (new badge,
//!    new XP total), re-entering the persistence pipeline.
//! 3. Arm the trailing-edge write debounce; a background flush task persists
//!    the final state after the quiescence window.
//!
//! Remote snapshots flow in through a watch task and pass through the write
//! policy's echo gate; the first snapshot after subscribing overwrites local
//! defaults exactly once.

use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::db::DocumentStore;
use crate::error::SyncError;
use crate::events::{EventBus, SessionEvent};
use crate::gamification::{
    calculate_total_xp, consecutive_study_days, newly_earned, CustomStats, DerivedStats,
    EvalContext, XpProgress,
};
use crate::models::{StudyMetrics, UserDocument, UserIdentity, UserProfile};
use crate::sync::adapter::RemoteSyncAdapter;
use crate::sync::policy::{SnapshotDecision, WritePolicy};

struct MetricsState {
    identity: Option<UserIdentity>,
    metrics: StudyMetrics,
    custom: CustomStats,
    policy: WritePolicy,
    /// Bumped on every identity change; background tasks from a previous
    /// identity bail out when their epoch no longer matches.
    epoch: u64,
}

struct Shared {
    state: Mutex<MetricsState>,
    wake: Notify,
    events: EventBus,
}

/// Synchronized study metrics for one session.
pub struct MetricsStore<S> {
    shared: Arc<Shared>,
    adapter: Arc<RemoteSyncAdapter<S>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: DocumentStore> MetricsStore<S> {
    pub fn new(adapter: Arc<RemoteSyncAdapter<S>>, events: EventBus, config: &Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MetricsState {
                    identity: None,
                    metrics: StudyMetrics::default(),
                    custom: CustomStats::default(),
                    policy: WritePolicy::new(config.write_debounce, config.echo_window),
                    epoch: 0,
                }),
                wake: Notify::new(),
                events,
            }),
            adapter,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Switch identity (login, logout, account change).
    ///
    /// The store resets to defaults synchronously, before any remote I/O, so
    /// no field of the previous identity is ever visible to the new one.
    pub async fn set_identity(&self, identity: Option<UserIdentity>) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }

        let epoch = {
            let mut st = self.shared.state.lock().unwrap();
            st.metrics = StudyMetrics::default();
            st.custom = CustomStats::default();
            st.policy.reset();
            st.identity = identity.clone();
            st.epoch += 1;
            st.epoch
        };

        let Some(identity) = identity else {
            return;
        };
        let user_id = identity.user_id.clone();

        // Seed the backing document if this user has none yet, then take the
        // current remote state as the session's initial load.
        let now = Utc::now().to_rfc3339();
        let seed = UserDocument::seed(UserProfile::from_identity(&identity, &now));
        if let Err(e) = self.adapter.initialize(&user_id, &seed).await {
            tracing::error!(user_id = %user_id, error = %e, "User document initialization failed");
        }
        match self.adapter.read(&user_id).await {
            Ok(Some(doc)) => apply_snapshot(&self.shared, doc, epoch),
            Ok(None) => {} // first watch delivery will be the initial load
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Initial metrics read failed")
            }
        }

        let mut watch = self.adapter.subscribe(&user_id);
        let shared = self.shared.clone();
        let watch_task = tokio::spawn(async move {
            while let Some(doc) = watch.next().await {
                apply_snapshot(&shared, doc, epoch);
            }
        });

        let flush_task = tokio::spawn(flush_loop(
            self.shared.clone(),
            self.adapter.clone(),
            user_id,
            epoch,
        ));

        *self.tasks.lock().unwrap() = vec![watch_task, flush_task];
    }

    /// Identity currently bound to this store, if any.
    pub fn identity(&self) -> Option<UserIdentity> {
        self.shared.state.lock().unwrap().identity.clone()
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> StudyMetrics {
        self.shared.state.lock().unwrap().metrics.clone()
    }

    /// Current position on the level curve.
    pub fn xp_progress(&self) -> XpProgress {
        XpProgress::from_total_xp(self.shared.state.lock().unwrap().metrics.total_xp)
    }

    pub fn record_flashcard_review(&self, correct: bool) {
        self.mutate(|metrics, _| metrics.record_flashcard_review(correct));
    }

    pub fn record_quiz_result(&self, correct: u32, total: u32) {
        self.mutate(|metrics, _| metrics.record_quiz_result(correct, total));
    }

    pub fn record_ai_interaction(&self) {
        self.mutate(|metrics, _| metrics.record_ai_interaction());
    }

    pub fn record_study_minutes(&self, minutes: u32) {
        self.mutate(|metrics, today| metrics.record_study_minutes(minutes, today));
    }

    /// Update counters owned by other feature areas (notes, decks, goals)
    /// that only matter for badge eligibility here.
    pub fn set_custom_stats(&self, custom: CustomStats) {
        let now = Instant::now();
        let today = Utc::now().date_naive();
        {
            let mut st = self.shared.state.lock().unwrap();
            st.custom = custom;
            recompute_derived(&mut st, &self.shared.events, now, today);
        }
        self.shared.wake.notify_one();
    }

    fn mutate(&self, f: impl FnOnce(&mut StudyMetrics, NaiveDate)) {
        let now = Instant::now();
        let today = Utc::now().date_naive();
        {
            let mut st = self.shared.state.lock().unwrap();
            f(&mut st.metrics, today);
            st.policy.mutated(now);
            recompute_derived(&mut st, &self.shared.events, now, today);
        }
        self.shared.wake.notify_one();
    }
}

impl<S> Drop for MetricsStore<S> {
    fn drop(&mut self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

/// Recompute XP and badge state after any metrics change.
///
/// A change to the derived fields (new XP total, newly earned badges) dirties
/// the metrics and re-arms the write debounce.
fn recompute_derived(st: &mut MetricsState, events: &EventBus, now: Instant, today: NaiveDate) {
    let previous_level = XpProgress::from_total_xp(st.metrics.total_xp).level;

    let total_xp = calculate_total_xp(&st.metrics, today);
    let streak = consecutive_study_days(&st.metrics, today);
    let xp = XpProgress::from_total_xp(total_xp);
    let fresh = {
        let ctx = EvalContext {
            metrics: &st.metrics,
            derived: DerivedStats::from_metrics(&st.metrics, streak),
            custom: st.custom,
            xp,
        };
        newly_earned(&st.metrics.earned_badges, &ctx)
    };

    let mut changed = false;
    if st.metrics.total_xp != total_xp {
        st.metrics.total_xp = total_xp;
        changed = true;
    }
    for badge_id in fresh {
        tracing::info!(badge_id = %badge_id, "Badge earned");
        events.emit(SessionEvent::BadgeEarned {
            badge_id: badge_id.clone(),
        });
        st.metrics.earned_badges.push(badge_id);
        changed = true;
    }
    if xp.level > previous_level {
        events.emit(SessionEvent::LevelUp { level: xp.level });
    }
    if changed {
        st.policy.mutated(now);
    }
}

/// Apply one incoming remote snapshot, subject to the echo gate.
fn apply_snapshot(shared: &Shared, doc: UserDocument, epoch: u64) {
    let now = Instant::now();
    let today = Utc::now().date_naive();
    {
        let mut st = shared.state.lock().unwrap();
        if st.epoch != epoch {
            return;
        }
        match st.policy.snapshot_decision(now) {
            SnapshotDecision::DiscardEcho => {
                tracing::debug!("Remote metrics snapshot discarded as echo");
                return;
            }
            SnapshotDecision::ApplyInitial | SnapshotDecision::Apply => {
                if let Some(metrics) = doc.study_metrics {
                    st.metrics = metrics;
                    recompute_derived(&mut st, &shared.events, now, today);
                }
            }
        }
    }
    shared.wake.notify_one();
}

/// Background flush loop: trailing-edge debounce, then persist.
async fn flush_loop<S: DocumentStore>(
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
            // New mutation restarted the window; recompute the deadline.
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
            if st.metrics.is_default() {
                // Never persist a no-op initial state.
                st.policy.write_skipped(now);
                continue;
            }
            st.metrics.clone()
        };

        let stamp = Utc::now().to_rfc3339();
        let doc = UserDocument::with_metrics(payload, &stamp);
        let result = adapter.write_section(&user_id, &doc).await;

        let now = Instant::now();
        let mut st = shared.state.lock().unwrap();
        if st.epoch != epoch {
            return;
        }
        match result {
            Ok(()) => {
                st.policy.write_completed(now);
                tracing::debug!(user_id = %user_id, "Metrics flushed");
            }
            Err(SyncError::QuotaExhausted(msg)) => {
                // Soft quota warning; drop the write rather than hammer the
                // backend with retries. Memory keeps the newer state.
                tracing::warn!(user_id = %user_id, detail = %msg, "Metrics flush hit quota");
                st.policy.write_completed(now);
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Metrics flush failed");
                st.policy.write_failed(now);
            }
        }
    }
}
