//! Admission gate: a counting permit pool bounding in-flight work.
//!
//! Each admitted task holds one [`Permit`]; dropping it returns the slot to
//! the pool, so release happens on every exit path (normal return, error,
//! panic unwind, or the task being dropped).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::DispatchError;

#[derive(Debug)]
struct GateCounters {
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// Shared permit pool. Cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    limit: usize,
    sem: Arc<Semaphore>,
    counters: Arc<GateCounters>,
}

/// One unit of admitted capacity. Released when dropped.
#[derive(Debug)]
pub struct Permit {
    counters: Arc<GateCounters>,
    _permit: OwnedSemaphorePermit,
}

impl Permit {
    /// Return the slot to the pool. Same as dropping the permit.
    pub fn release(self) {}
}

impl Drop for Permit {
    fn drop(&mut self) {
        // Runs before `_permit` is dropped, so `in_use` never over-reports
        // once the semaphore slot is visible to the next waiter.
        self.counters.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AdmissionGate {
    /// Create a gate with `limit` permits (at least 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            sem: Arc::new(Semaphore::new(limit)),
            counters: Arc::new(GateCounters {
                in_use: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.counters.in_use.load(Ordering::Acquire)
    }

    /// Permits that could be taken right now without waiting.
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    /// Highest number of permits held at the same time since creation.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }

    /// Wait until a permit is free and take it.
    pub async fn acquire(&self) -> Result<Permit, DispatchError> {
        let permit = Arc::clone(&self.sem)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::Closed)?;
        Ok(self.admit(permit))
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Permit, DispatchError> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(res) => res,
            Err(_) => Err(DispatchError::AdmissionTimeout { waited: timeout }),
        }
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        let permit = Arc::clone(&self.sem).try_acquire_owned().ok()?;
        Some(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> Permit {
        let now = self.counters.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(now, Ordering::AcqRel);
        Permit {
            counters: Arc::clone(&self.counters),
            _permit: permit,
        }
    }
}
