//! Per-share signing locks
//!
//! Two overlapping signing sessions on the same share can leak the private
//! share through nonce reuse if Party 1's nonce derivation is not strictly
//! session-scoped. The driver keeps no shared state, so serializing signs is
//! the caller's job; [`SigningLocks`] is the mechanism for doing it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// One async mutex per share id
#[derive(Clone, Default)]
pub struct SigningLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SigningLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder signs with `id`, then hold it until the guard drops
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        // Only the map references an idle lock; held or awaited ones have clones
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = self.locks.entry(id.to_string()).or_default().clone();
        trace!(id, "Waiting for signing lock");
        lock.lock_owned().await
    }

    /// Number of share ids with a lock entry, idle ones included until the next `acquire`
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
