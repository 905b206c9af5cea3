//! Admission control in front of the adapters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::error::{AppError, Result};

/// Configuration for admission control
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Maximum number of adapter invocations running at once
    pub max_concurrent: usize,
    /// Maximum number of requests waiting for a slot
    pub max_pending: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            max_pending: 64,
        }
    }
}

/// Bounds concurrent invocations and the number of waiters
pub struct AdmissionControl {
    semaphore: Arc<Semaphore>,
    config: AdmissionConfig,
    pending: AtomicUsize,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

/// Decrements the waiting count even if the waiter is cancelled
struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AdmissionControl {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            pending: AtomicUsize::new(0),
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Wait for an invocation slot; the slot is released when the permit drops
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            self.admitted.fetch_add(1, Ordering::Relaxed);
            return Ok(permit);
        }

        let waiting = self.pending.fetch_add(1, Ordering::AcqRel);
        let _guard = PendingGuard(&self.pending);

        if waiting >= self.config.max_pending {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(waiting, max_pending = self.config.max_pending, "Rejecting request, queue full");
            return Err(AppError::Overloaded("generation queue is full".to_string()));
        }

        debug!(waiting = waiting + 1, "Waiting for an invocation slot");

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("admission control closed".to_string()))?;

        self.admitted.fetch_add(1, Ordering::Relaxed);
        Ok(permit)
    }

    /// Get queue statistics
    pub fn stats(&self) -> AdmissionStats {
        let max_concurrent = self.config.max_concurrent.max(1);
        AdmissionStats {
            in_flight: max_concurrent.saturating_sub(self.semaphore.available_permits()),
            waiting: self.pending.load(Ordering::Acquire),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            max_concurrent,
            max_pending: self.config.max_pending,
        }
    }
}

/// Admission statistics
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionStats {
    pub in_flight: usize,
    pub waiting: usize,
    pub admitted: u64,
    pub rejected: u64,
    pub max_concurrent: usize,
    pub max_pending: usize,
}
