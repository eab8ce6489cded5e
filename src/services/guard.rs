//! Per-execution in-flight registry.
//!
//! At most one mutating call may be pending for a given execution. A second
//! caller arriving while the first is still running gets `409 Conflict`
//! instead of queueing behind it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Process-local set of executions with a pending mutation.
#[derive(Clone, Default)]
pub struct InFlight {
    pending: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        // A panic while holding the lock leaves the set itself consistent
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `id` for the lifetime of the returned guard.
    pub fn acquire(&self, id: Uuid) -> AppResult<InFlightGuard> {
        if !self.lock().insert(id) {
            return Err(AppError::Conflict(format!(
                "Another action on execution {} is still in progress",
                id
            )));
        }
        Ok(InFlightGuard {
            registry: self.clone(),
            id,
        })
    }

    pub fn is_pending(&self, id: Uuid) -> bool {
        self.lock().contains(&id)
    }
}

/// Releases the claim on drop, including on early `?` returns.
pub struct InFlightGuard {
    registry: InFlight,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
