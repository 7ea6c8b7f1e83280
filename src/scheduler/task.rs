//! Task trait, suspension directives, and the poll context
//!
//! A task is a stackless state machine: the scheduler calls
//! [`ProtoTask::poll`] and the body runs from its saved resume point until it
//! returns a [`Directive`] naming its next suspension. All of a task's
//! "locals" live in the implementing struct, which doubles as the resume
//! point - there is no per-task stack to swap.
//!
//! Everything between two suspension points executes atomically with respect
//! to other tasks. A `poll` that never returns starves every lower-slot
//! task; the scheduler does not detect or defend against this.

use super::error::SchedError;
use super::semaphore::SchedSemaphore;
use super::timer::{SchedTimer, TimerArena, TimerHandle};
use super::types::WakeReason;

/// A cooperatively scheduled task body.
///
/// Implementors keep their state across suspensions in `self`; the
/// scheduler owns only the lifecycle state and wait bookkeeping.
pub trait ProtoTask {
    /// Runs the task from its resume point to the next suspension.
    fn poll(&mut self, ctx: &mut TaskCtx<'_>) -> Directive;
}

/// What a task asks the scheduler to do next.
#[derive(Clone, Copy)]
pub enum Directive {
    /// Stay runnable; run again once the aging counter allows it
    Yield,
    /// Suspend until the referenced arena timer fires
    WaitTimer(TimerHandle),
    /// Suspend until the semaphore is signaled or `timeout_us` elapses.
    /// Use `u64::MAX` to wait indefinitely.
    WaitSemaphore {
        sem: &'static SchedSemaphore,
        timeout_us: u64,
    },
    /// Terminate; the task becomes a zombie and never runs again
    Stop,
}

/// Per-poll context handed to a task body.
///
/// Gives the task the current time, the reason its last wait ended, and
/// access to the timer arena.
pub struct TaskCtx<'a> {
    pub(crate) now_us: u64,
    pub(crate) wake_reason: WakeReason,
    pub(crate) timers: &'a mut TimerArena,
}

impl TaskCtx<'_> {
    /// Current time in microseconds, frozen at the start of this poll.
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Why the most recent wait unblocked. [`WakeReason::Unknown`] until the
    /// task has completed a wait.
    pub fn wake_reason(&self) -> WakeReason {
        self.wake_reason
    }

    /// Allocates a periodic timer from the arena, starting now.
    ///
    /// The timer logically belongs to the calling task; the handle is only a
    /// non-owning reference into the arena.
    pub fn create_timer(&mut self, period_us: u64) -> Result<TimerHandle, SchedError> {
        self.timers.create(period_us, self.now_us)
    }

    /// Read access to a previously created timer, e.g. for the measured
    /// inter-fire interval.
    pub fn timer(&self, handle: TimerHandle) -> Option<&SchedTimer> {
        self.timers.get(handle)
    }
}
