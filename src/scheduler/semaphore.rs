//! Binary edge-triggered semaphores
//!
//! A `SchedSemaphore` carries at most one pending event: signaling an
//! already-signaled semaphore is observably a no-op, and consumption clears
//! the flag in one atomic step. There is no count and no wait queue -
//! "waiting" is a task state re-polled every scheduler tick, not a kernel
//! block/wake primitive.
//!
//! `signal` is the one scheduler entry point that is safe from interrupt
//! context: it is a single atomic store and touches no other shared state.
//! Semaphores are typically created in `static`s so an ISR and a task can
//! share them:
//!
//! ```
//! use protosched::scheduler::SchedSemaphore;
//!
//! static DATA_READY: SchedSemaphore = SchedSemaphore::new();
//!
//! // interrupt handler:
//! DATA_READY.signal();
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-slot binary event flag
#[derive(Debug, Default)]
pub struct SchedSemaphore {
    signaled: AtomicBool,
}

impl SchedSemaphore {
    /// Creates a semaphore in the clear state.
    pub const fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
        }
    }

    /// Clears any pending signal.
    pub fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    /// Raises the flag. Safe from task or interrupt context; signals
    /// delivered before consumption collapse into one.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// True if a signal is pending.
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    /// Consumes a pending signal, if any. Returns true at most once per
    /// signal batch.
    pub(crate) fn check_and_consume(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }
}
