//! Per-entity serialization primitives.
//!
//! All balance mutations for a given account must be serialized, and per-rule
//! recurrence processing must be atomic with respect to itself. The registry
//! hands out one async mutex per entity id, created on first use.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-id async locks.
///
/// The registry never evicts: the set of live accounts and rules is small and
/// the per-entry cost is one `Arc<Mutex<()>>`.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires the lock for a single entity.
    pub async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        self.entry(id).lock_owned().await
    }

    /// Acquires locks for two entities in ascending id order.
    ///
    /// Fixed global ordering prevents deadlock when two concurrent callers
    /// reference the same pair in opposite order. The ids must be distinct.
    pub async fn lock_pair(&self, a: Uuid, b: Uuid) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        debug_assert_ne!(a, b, "lock_pair requires distinct ids");
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.entry(first).lock_owned().await;
        let second_guard = self.entry(second).lock_owned().await;
        (first_guard, second_guard)
    }
}
