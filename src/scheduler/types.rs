//! Core types for the cooperative scheduler
//!
//! This module defines the externally visible vocabulary of the scheduler:
//! task lifecycle states, wake reasons, slot identifiers, and the
//! introspection snapshot returned by the query API.

/// Maximum number of task slots
///
/// Slots are allocated first-fit and never reclaimed, so this bounds the
/// number of tasks ever created over the life of a scheduler, not just the
/// number alive at once.
pub const MAX_TASKS: usize = 16;

/// Maximum number of timers in the arena
pub const MAX_TIMERS: usize = 16;

/// Width of the CPU-load measurement window in microseconds
pub(crate) const LOAD_WINDOW_US: u64 = 200_000;

/// Load percentage above which the accounting task logs a warning
pub(crate) const LOAD_WARNING_THRESHOLD: u8 = 75;

/// Task lifecycle state
///
/// The only state machine a task has from the scheduler's point of view.
/// `Zombie` is terminal: the slot stays allocated but the task body never
/// runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Allocated but never started; never scheduled
    Idle,
    /// Eligible to execute once the aging counter reaches zero
    Running,
    /// Suspended until an arena timer fires
    WaitingTimer,
    /// Suspended until a semaphore is signaled or the timeout expires
    WaitingSemaphore,
    /// Terminal; the task function will never run again
    Zombie,
}

/// Why the last wait unblocked
///
/// Recorded on the task's control block when a waiting task transitions back
/// to [`TaskState::Running`], and handed to the task body through
/// [`crate::scheduler::TaskCtx::wake_reason`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeReason {
    /// No wait has completed yet
    #[default]
    Unknown,
    /// The caller-supplied timeout expired before the wait condition was met
    Timeout,
    /// The waited-on object fired (timer deadline or semaphore signal)
    Event,
}

/// Handle to an allocated task slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Slot index inside the task table
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Point-in-time snapshot of one task slot
///
/// Copied out of the control block on demand; holding one does not borrow
/// the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskInfo {
    /// Human-readable task name for logging and debugging
    pub name: &'static str,
    /// Current lifecycle state
    pub state: TaskState,
    /// Static base priority assigned at creation (0 = every tick)
    pub base_priority: u8,
    /// Cumulative microseconds of CPU time consumed by this task
    pub total_run_time_us: u64,
}
