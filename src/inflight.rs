//! Bookkeeping of calls that are currently running.
//!
//! Entries only feed logging and diagnostics. They are removed by an RAII
//! guard, so completed, failed, timed-out and cancelled calls all leave the
//! registry clean.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

/// Identifier assigned to each executor call.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Shared map of running calls to their current attempt number.
///
/// Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    next_id: Arc<AtomicU64>,
    attempts: Arc<Mutex<HashMap<RequestId, u32>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current attempt of a running call, if it is still running.
    pub fn attempt(&self, id: RequestId) -> Option<u32> {
        self.lock().get(&id).copied()
    }

    /// Running calls ordered by id.
    pub fn snapshot(&self) -> Vec<(RequestId, u32)> {
        let mut entries: Vec<_> = self.lock().iter().map(|(id, n)| (*id, *n)).collect();
        entries.sort_unstable();
        entries
    }

    pub(crate) fn register(&self) -> InFlightGuard {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().insert(id, 0);
        InFlightGuard {
            id,
            registry: self.clone(),
        }
    }

    // A panic while holding the lock cannot leave the map inconsistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, u32>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct InFlightGuard {
    pub(crate) id: RequestId,
    registry: InFlightRegistry,
}

impl InFlightGuard {
    pub(crate) fn set_attempt(&self, attempt: u32) {
        self.registry.lock().insert(self.id, attempt);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
