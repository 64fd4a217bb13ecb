//! Admission limiter for outstanding fetches.
//!
//! Every verification task takes a permit before it issues a network request
//! and drops it as soon as the request returns, so at most `capacity` fetches
//! are in flight across the whole run regardless of how many tasks exist.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};

/// Shared counting gate. Wrap in an `Arc` and clone it into each task.
#[derive(Debug)]
pub struct AdmissionLimiter {
    capacity: usize,
    slots: Semaphore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionLimiter {
    /// Create a limiter admitting at most `capacity` holders (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Semaphore::new(capacity),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Holders currently admitted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous holders observed so far.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Wait until fewer than `capacity` holders are admitted, then admit the caller.
    /// Dropping the returned permit releases the slot.
    pub async fn acquire(&self) -> AdmissionPermit<'_> {
        // The semaphore is owned by this limiter and never closed.
        let permit = match self.slots.acquire().await {
            Ok(p) => p,
            Err(_) => unreachable!("admission semaphore closed"),
        };
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        AdmissionPermit {
            limiter: self,
            _permit: permit,
        }
    }
}

/// Releases its admission slot when dropped.
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    limiter: &'a AdmissionLimiter,
    _permit: SemaphorePermit<'a>,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
