//! Bounded admission for expensive pipeline stages.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of concurrent source reads.
pub const DEFAULT_SLURP_CONCURRENCY: usize = 5;

/// Default number of concurrent decode/encode operations.
pub const DEFAULT_RESIZE_CONCURRENCY: usize = 2;

/// A named counting gate with fixed capacity.
///
/// [`Gate::acquire`] waits until a slot is free. The slot is released when the
/// returned [`GatePermit`] is dropped.
#[derive(Debug, Clone)]
pub struct Gate {
    name: &'static str,
    capacity: usize,
    slots: Arc<Semaphore>,
}

/// Proof of admission through a [`Gate`]. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl Gate {
    /// Create a gate admitting at most `capacity` holders at once.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> GatePermit {
        let permit = match self.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is owned by this gate and never closed.
            Err(_) => unreachable!("gate {} semaphore closed", self.name),
        };
        GatePermit { _permit: permit }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
