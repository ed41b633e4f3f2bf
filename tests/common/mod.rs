// SPDX-License-Identifier: MIT

use std::sync::Arc;

use study_sync::config::Config;
use study_sync::db::{MemoryLocalStorage, MemoryStore};
use study_sync::SessionCore;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

pub type MemorySession = SessionCore<MemoryStore, MemoryLocalStorage>;

/// Create a session over in-memory backends, returning the backends too so
/// tests can play the role of "another client".
#[allow(dead_code)]
pub fn memory_session() -> (Arc<MemorySession>, Arc<MemoryStore>, Arc<MemoryLocalStorage>) {
    let store = MemoryStore::new();
    let local = MemoryLocalStorage::new();
    let session = SessionCore::new(Config::default(), store.clone(), local.clone());
    (Arc::new(session), store, local)
}

/// Opt-in log output for debugging a failing test.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
