// SPDX-License-Identifier: MIT

//! Debounced-write policy state machine.
//!
//! Each synchronized store owns one `WritePolicy` that decides when to flush
//! local mutations and which incoming remote snapshots are echoes of this
//! client's own writes. States:
//!
//! - `Idle`: nothing to write.
//! - `Pending { deadline }`: mutations happened; flush once `deadline` of
//!   quiescence passes. Every mutation restarts the deadline (trailing-edge
//!   debounce, not throttling).
//! - `Writing`: a flush is in progress. Mutations during this state re-arm
//!   a new pending deadline once the write completes.
//! - `CoolingDown { until }`: a flush just completed; snapshots arriving
//!   before `until` are discarded as echoes.
//!
//! The echo gate survives a CoolingDown -> Pending transition (a mutation
//! right after a flush), so the full echo window after a flush always holds.
//!
//! The very first snapshot after a (re)subscribe is authoritative and always
//! applied, exactly once.

use tokio::time::{Duration, Instant};

/// Current state of the write pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    Pending { deadline: Instant },
    Writing,
    CoolingDown { until: Instant },
}

/// What to do with an incoming remote snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// First snapshot of the session: overwrite local defaults.
    ApplyInitial,
    /// New external data: apply.
    Apply,
    /// Echo of a local write still inside the echo window: discard.
    DiscardEcho,
}

/// Debounce and echo-suppression policy for one synchronized store.
#[derive(Debug)]
pub struct WritePolicy {
    state: WriteState,
    debounce: Duration,
    echo_window: Duration,
    /// Echo gate; outlives the CoolingDown state when a mutation re-arms
    /// a pending write right after a flush.
    echo_until: Option<Instant>,
    /// A mutation arrived while a write was in progress.
    dirty_while_writing: bool,
    /// The next snapshot is the session's initial load.
    initial_load_pending: bool,
}

impl WritePolicy {
    pub fn new(debounce: Duration, echo_window: Duration) -> Self {
        Self {
            state: WriteState::Idle,
            debounce,
            echo_window,
            echo_until: None,
            dirty_while_writing: false,
            initial_load_pending: true,
        }
    }

    /// Reset for a new identity: clean slate, initial load re-armed.
    pub fn reset(&mut self) {
        self.state = WriteState::Idle;
        self.echo_until = None;
        self.dirty_while_writing = false;
        self.initial_load_pending = true;
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Record a local mutation at `now`.
    pub fn mutated(&mut self, now: Instant) {
        match self.state {
            WriteState::Writing => self.dirty_while_writing = true,
            _ => {
                self.state = WriteState::Pending {
                    deadline: now + self.debounce,
                }
            }
        }
    }

    /// When the next flush should happen, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            WriteState::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Try to start a flush. Returns false when no flush is due at `now`.
    pub fn begin_write(&mut self, now: Instant) -> bool {
        match self.state {
            WriteState::Pending { deadline } if now >= deadline => {
                self.state = WriteState::Writing;
                true
            }
            _ => false,
        }
    }

    /// The flush turned out to be a no-op (nothing worth persisting).
    pub fn write_skipped(&mut self, now: Instant) {
        debug_assert!(matches!(self.state, WriteState::Writing));
        self.state = if self.dirty_while_writing {
            self.dirty_while_writing = false;
            WriteState::Pending {
                deadline: now + self.debounce,
            }
        } else {
            WriteState::Idle
        };
    }

    /// The flush succeeded: open the echo window.
    pub fn write_completed(&mut self, now: Instant) {
        self.echo_until = Some(now + self.echo_window);
        self.state = if self.dirty_while_writing {
            self.dirty_while_writing = false;
            WriteState::Pending {
                deadline: now + self.debounce,
            }
        } else {
            WriteState::CoolingDown {
                until: now + self.echo_window,
            }
        };
    }

    /// The flush failed: keep the data dirty and retry after another
    /// debounce window. In-memory state is never rolled back.
    pub fn write_failed(&mut self, now: Instant) {
        self.dirty_while_writing = false;
        self.state = WriteState::Pending {
            deadline: now + self.debounce,
        };
    }

    /// Decide what to do with a remote snapshot arriving at `now`.
    ///
    /// Consumes the initial-load flag on first use.
    pub fn snapshot_decision(&mut self, now: Instant) -> SnapshotDecision {
        if self.initial_load_pending {
            self.initial_load_pending = false;
            return SnapshotDecision::ApplyInitial;
        }

        self.expire(now);

        if matches!(self.state, WriteState::Writing) {
            return SnapshotDecision::DiscardEcho;
        }
        if let Some(until) = self.echo_until {
            if now < until {
                return SnapshotDecision::DiscardEcho;
            }
        }
        SnapshotDecision::Apply
    }

    /// Expire the cooldown state and echo gate.
    fn expire(&mut self, now: Instant) {
        if let WriteState::CoolingDown { until } = self.state {
            if now >= until {
                self.state = WriteState::Idle;
            }
        }
        if matches!(self.echo_until, Some(until) if now >= until) {
            self.echo_until = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_secs(5);
    const ECHO: Duration = Duration::from_secs(2);

    fn policy() -> WritePolicy {
        WritePolicy::new(DEBOUNCE, ECHO)
    }

    #[tokio::test]
    async fn test_mutation_arms_trailing_deadline() {
        let mut p = policy();
        let t0 = Instant::now();
        p.mutated(t0);
        assert_eq!(p.next_deadline(), Some(t0 + DEBOUNCE));

        // A later mutation restarts the window
        let t1 = t0 + Duration::from_secs(3);
        p.mutated(t1);
        assert_eq!(p.next_deadline(), Some(t1 + DEBOUNCE));
    }

    #[tokio::test]
    async fn test_begin_write_only_after_quiescence() {
        let mut p = policy();
        let t0 = Instant::now();
        p.mutated(t0);
        assert!(!p.begin_write(t0 + Duration::from_secs(4)));
        assert!(p.begin_write(t0 + DEBOUNCE));
        assert_eq!(p.state(), WriteState::Writing);
    }

    #[tokio::test]
    async fn test_first_snapshot_is_initial_load_exactly_once() {
        let mut p = policy();
        let t0 = Instant::now();
        assert_eq!(p.snapshot_decision(t0), SnapshotDecision::ApplyInitial);
        assert_eq!(p.snapshot_decision(t0), SnapshotDecision::Apply);
    }

    #[tokio::test]
    async fn test_snapshot_discarded_inside_echo_window() {
        let mut p = policy();
        let t0 = Instant::now();
        p.snapshot_decision(t0); // consume initial load

        p.mutated(t0);
        assert!(p.begin_write(t0 + DEBOUNCE));
        p.write_completed(t0 + DEBOUNCE);

        let in_window = t0 + DEBOUNCE + Duration::from_secs(1);
        assert_eq!(p.snapshot_decision(in_window), SnapshotDecision::DiscardEcho);

        let after_window = t0 + DEBOUNCE + ECHO;
        assert_eq!(p.snapshot_decision(after_window), SnapshotDecision::Apply);
    }

    #[tokio::test]
    async fn test_echo_gate_survives_mutation_after_flush() {
        let mut p = policy();
        let t0 = Instant::now();
        p.snapshot_decision(t0);

        p.mutated(t0);
        assert!(p.begin_write(t0 + DEBOUNCE));
        p.write_completed(t0 + DEBOUNCE);

        // Mutation right after the flush moves to Pending...
        p.mutated(t0 + DEBOUNCE + Duration::from_millis(100));
        assert!(matches!(p.state(), WriteState::Pending { .. }));

        // ...but a snapshot inside the window is still an echo.
        let in_window = t0 + DEBOUNCE + Duration::from_millis(500);
        assert_eq!(p.snapshot_decision(in_window), SnapshotDecision::DiscardEcho);
    }

    #[tokio::test]
    async fn test_mutation_during_write_rearms_pending() {
        let mut p = policy();
        let t0 = Instant::now();
        p.mutated(t0);
        assert!(p.begin_write(t0 + DEBOUNCE));

        p.mutated(t0 + DEBOUNCE); // arrives while Writing
        p.write_completed(t0 + DEBOUNCE + Duration::from_millis(50));
        assert!(matches!(p.state(), WriteState::Pending { .. }));
    }

    #[tokio::test]
    async fn test_failed_write_retries_without_rollback() {
        let mut p = policy();
        let t0 = Instant::now();
        p.mutated(t0);
        assert!(p.begin_write(t0 + DEBOUNCE));
        p.write_failed(t0 + DEBOUNCE);
        assert!(p.next_deadline().is_some());
    }

    #[tokio::test]
    async fn test_reset_rearms_initial_load() {
        let mut p = policy();
        let t0 = Instant::now();
        p.snapshot_decision(t0);
        p.mutated(t0);
        p.reset();
        assert_eq!(p.state(), WriteState::Idle);
        assert_eq!(p.snapshot_decision(t0), SnapshotDecision::ApplyInitial);
    }
}
