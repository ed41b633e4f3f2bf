// SPDX-License-Identifier: MIT

//! State synchronization layer: write policy, remote adapter, and the
//! per-feature synchronized stores.

pub mod adapter;
pub mod chat;
pub mod metrics;
pub mod policy;

pub use adapter::RemoteSyncAdapter;
pub use chat::{ChatStore, CHAT_STORAGE_KEY};
pub use metrics::MetricsStore;
pub use policy::{SnapshotDecision, WritePolicy, WriteState};
