//! Scheduler core - per-tick dispatch, priority aging, and load accounting
//!
//! [`Scheduler::tick`] is the whole engine: one pass over the task table in
//! slot order, aging every task's priority counter, re-checking wait
//! conditions, and running whatever is due. Execution happens on the
//! caller's stack; a task gives control back only by returning a
//! [`Directive`] from its `poll`.
//!
//! The scheduler is an owned value. `&mut self` on every mutating entry
//! point makes reentrant invocation unrepresentable; the only operation
//! reachable from interrupt context is [`SchedSemaphore::signal`].

use crate::traits::time::TimeSource;

use super::error::SchedError;
use super::semaphore::SchedSemaphore;
use super::task::{Directive, ProtoTask, TaskCtx};
use super::timer::{TimerArena, TimerHandle};
use super::types::{
    TaskId, TaskInfo, TaskState, WakeReason, LOAD_WARNING_THRESHOLD, LOAD_WINDOW_US, MAX_TASKS,
};

/// Tagged, non-owning reference to the object a task is waiting on.
#[derive(Clone, Copy)]
enum WaitObject {
    Timer(TimerHandle),
    Semaphore(&'static SchedSemaphore),
}

/// Wait bookkeeping; present only while a task is suspended.
#[derive(Clone, Copy)]
struct WaitContext {
    object: WaitObject,
    started_us: u64,
    timeout_us: Option<u64>,
}

/// The body behind a task slot.
enum TaskEntry<'t> {
    /// Built-in accounting task (always slot 0)
    System(SystemTask),
    /// Caller-owned task object
    User(&'t mut dyn ProtoTask),
}

/// Task control block - one fixed slot per task, never reclaimed.
struct Tcb<'t> {
    name: &'static str,
    base_priority: u8,
    /// Aging counter: decremented every tick, reset to base after each run.
    /// The task is eligible only while this is zero.
    dyn_priority: u8,
    state: TaskState,
    wait: Option<WaitContext>,
    wake_reason: WakeReason,
    total_run_time_us: u64,
    entry: TaskEntry<'t>,
}

impl Tcb<'_> {
    fn wake(&mut self, reason: WakeReason) {
        self.wake_reason = reason;
        self.state = TaskState::Running;
        self.wait = None;
    }

    fn info(&self) -> TaskInfo {
        TaskInfo {
            name: self.name,
            state: self.state,
            base_priority: self.base_priority,
            total_run_time_us: self.total_run_time_us,
        }
    }
}

/// Run-time accumulators behind the CPU-load metric.
struct LoadAccounting {
    task_time_us: u64,
    sched_time_us: u64,
    avg_load_percent: u8,
}

impl LoadAccounting {
    const fn new() -> Self {
        Self {
            task_time_us: 0,
            sched_time_us: 0,
            avg_load_percent: 0,
        }
    }

    /// Closes the window just ended: publishes the load percentage and
    /// zeroes both accumulators, so each report covers only the most
    /// recent window rather than a lifetime average.
    fn report(&mut self) {
        let load = if self.sched_time_us == 0 {
            0
        } else {
            ((self.task_time_us * 100) / self.sched_time_us).min(100) as u8
        };
        self.avg_load_percent = load;
        crate::log_debug!(
            "scheduler load {}% (task {}us / sched {}us)",
            load,
            self.task_time_us,
            self.sched_time_us
        );
        if load >= LOAD_WARNING_THRESHOLD {
            crate::log_warn!("high scheduler load: {}%", load);
        }
        self.task_time_us = 0;
        self.sched_time_us = 0;
    }
}

/// Built-in accounting task.
///
/// Sleeps on a window timer and recomputes the load percentage every fire.
struct SystemTask {
    timer: Option<TimerHandle>,
}

impl SystemTask {
    const fn new() -> Self {
        Self { timer: None }
    }

    fn poll(&mut self, ctx: &mut TaskCtx<'_>, load: &mut LoadAccounting) -> Directive {
        match self.timer {
            None => match ctx.create_timer(LOAD_WINDOW_US) {
                Ok(handle) => {
                    self.timer = Some(handle);
                    Directive::WaitTimer(handle)
                }
                // the arena is empty at init; exhaustion here means the
                // window timer can never exist
                Err(_) => Directive::Stop,
            },
            Some(handle) => {
                load.report();
                Directive::WaitTimer(handle)
            }
        }
    }
}

/// Cooperative scheduler over a fixed task table.
///
/// `'t` is the lifetime of the caller-owned task objects registered with
/// [`create_task`](Scheduler::create_task); on embedded targets these are
/// typically `'static` (e.g. placed in `StaticCell`s), on the host they can
/// be plain locals outliving the scheduler.
pub struct Scheduler<'t, T: TimeSource> {
    time: T,
    tasks: [Option<Tcb<'t>>; MAX_TASKS],
    timers: TimerArena,
    load: LoadAccounting,
}

impl<'t, T: TimeSource> Scheduler<'t, T> {
    /// Creates the scheduler and installs the accounting task in slot 0.
    pub fn new(time: T) -> Self {
        let mut sched = Self {
            time,
            tasks: core::array::from_fn(|_| None),
            timers: TimerArena::new(),
            load: LoadAccounting::new(),
        };
        // the empty table cannot refuse slot 0
        let _ = sched.alloc_slot(TaskEntry::System(SystemTask::new()), "system", 0);
        crate::log_info!("scheduler: {} task slots", MAX_TASKS);
        sched
    }

    /// Registers a task.
    ///
    /// The slot is allocated first-fit; tasks start eligible (state
    /// `Running`, aging counter at base priority). Fails with
    /// [`SchedError::TaskTableFull`] when the table is exhausted, in which
    /// case no slot is mutated.
    pub fn create_task(
        &mut self,
        task: &'t mut dyn ProtoTask,
        name: &'static str,
        base_priority: u8,
    ) -> Result<TaskId, SchedError> {
        match self.alloc_slot(TaskEntry::User(task), name, base_priority) {
            Ok(id) => Ok(id),
            Err(err) => {
                crate::log_warn!("cannot create task {}: {}", name, err);
                Err(err)
            }
        }
    }

    fn alloc_slot(
        &mut self,
        entry: TaskEntry<'t>,
        name: &'static str,
        base_priority: u8,
    ) -> Result<TaskId, SchedError> {
        let slot = self
            .tasks
            .iter()
            .position(|s| s.is_none())
            .ok_or(SchedError::TaskTableFull)?;
        let mut tcb = Tcb {
            name,
            base_priority,
            dyn_priority: base_priority,
            state: TaskState::Idle,
            wait: None,
            wake_reason: WakeReason::Unknown,
            total_run_time_us: 0,
            entry,
        };
        // tasks start eligible
        tcb.state = TaskState::Running;
        self.tasks[slot] = Some(tcb);
        Ok(TaskId(slot))
    }

    /// One dispatcher pass.
    ///
    /// Walks all allocated slots in index order. Aging is unconditional;
    /// execution is gated on the counter having already reached zero, except
    /// that a wait satisfied during this pass runs immediately, in the same
    /// pass.
    pub fn tick(&mut self) {
        let entry_us = self.time.now_us();

        for slot in 0..self.tasks.len() {
            let (state, was_eligible) = {
                let Some(tcb) = self.tasks[slot].as_mut() else {
                    continue;
                };
                let was_eligible = tcb.dyn_priority == 0;
                if tcb.dyn_priority > 0 {
                    tcb.dyn_priority -= 1;
                }
                (tcb.state, was_eligible)
            };

            match state {
                TaskState::Idle | TaskState::Zombie => {}
                TaskState::Running => {
                    if was_eligible {
                        self.execute_slot(slot);
                    }
                }
                TaskState::WaitingTimer | TaskState::WaitingSemaphore => {
                    if self.try_wake(slot) {
                        self.execute_slot(slot);
                    }
                }
            }
        }

        let elapsed = self.time.now_us().saturating_sub(entry_us);
        self.load.sched_time_us += elapsed;
        // scheduler overhead is not billed to the system task; only task
        // execution time enters the load numerator
    }

    /// Re-evaluates a suspended task. Timeout expiry takes strict precedence
    /// over the wait object: a wait that both timed out and was satisfied in
    /// the same pass resolves as a timeout, and the object is not consumed.
    fn try_wake(&mut self, slot: usize) -> bool {
        let now_us = self.time.now_us();
        let Scheduler { tasks, timers, .. } = self;
        let Some(tcb) = tasks[slot].as_mut() else {
            return false;
        };
        let Some(wait) = tcb.wait else {
            return false;
        };

        if let Some(timeout_us) = wait.timeout_us {
            if now_us.saturating_sub(wait.started_us) >= timeout_us {
                tcb.wake(WakeReason::Timeout);
                return true;
            }
        }

        let fired = match wait.object {
            WaitObject::Timer(handle) => timers.check(handle, now_us),
            WaitObject::Semaphore(sem) => sem.check_and_consume(),
        };
        if fired {
            tcb.wake(WakeReason::Event);
        }
        fired
    }

    /// Runs one task body from its resume point to its next suspension and
    /// applies the resulting directive.
    fn execute_slot(&mut self, slot: usize) {
        let Scheduler {
            time,
            tasks,
            timers,
            load,
        } = self;
        let Some(tcb) = tasks[slot].as_mut() else {
            return;
        };

        let start_us = time.now_us();
        let mut ctx = TaskCtx {
            now_us: start_us,
            wake_reason: tcb.wake_reason,
            timers,
        };
        let directive = match &mut tcb.entry {
            TaskEntry::System(sys) => sys.poll(&mut ctx, load),
            TaskEntry::User(task) => task.poll(&mut ctx),
        };
        let end_us = time.now_us();

        let elapsed = end_us.saturating_sub(start_us);
        tcb.total_run_time_us += elapsed;
        load.task_time_us += elapsed;
        tcb.dyn_priority = tcb.base_priority;

        match directive {
            Directive::Yield => {
                tcb.state = TaskState::Running;
                tcb.wait = None;
            }
            Directive::WaitTimer(handle) => {
                tcb.state = TaskState::WaitingTimer;
                tcb.wait = Some(WaitContext {
                    object: WaitObject::Timer(handle),
                    started_us: end_us,
                    timeout_us: None,
                });
            }
            Directive::WaitSemaphore { sem, timeout_us } => {
                tcb.state = TaskState::WaitingSemaphore;
                tcb.wait = Some(WaitContext {
                    object: WaitObject::Semaphore(sem),
                    started_us: end_us,
                    timeout_us: Some(timeout_us),
                });
            }
            Directive::Stop => {
                tcb.state = TaskState::Zombie;
                tcb.wait = None;
            }
        }
    }

    /// Snapshot of one task slot, or `None` if the slot was never allocated.
    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        self.tasks
            .get(id.index())
            .and_then(|s| s.as_ref())
            .map(Tcb::info)
    }

    /// Snapshot of every allocated slot, in slot order.
    pub fn task_snapshot(&self) -> heapless::Vec<TaskInfo, MAX_TASKS> {
        let mut infos = heapless::Vec::new();
        for tcb in self.tasks.iter().flatten() {
            let _ = infos.push(tcb.info());
        }
        infos
    }

    /// Number of allocated task slots, the accounting task included.
    pub fn task_count(&self) -> usize {
        self.tasks.iter().flatten().count()
    }

    /// Load percentage published by the last accounting-window report.
    /// Reflects only the most recent window, not a lifetime average.
    pub fn average_load_percent(&self) -> u8 {
        self.load.avg_load_percent
    }
}
