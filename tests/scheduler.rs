//! Host integration tests for the cooperative scheduler.
//!
//! Everything runs on `MockTime`: the clock only moves when the test (or a
//! simulated task body) advances it, so tick-by-tick behavior is exactly
//! reproducible.

use std::cell::Cell;

use protosched::scheduler::{
    Directive, ProtoTask, SchedError, SchedSemaphore, Scheduler, TaskCtx, TaskState, TimerHandle,
    WakeReason, MAX_TASKS,
};
use protosched::traits::time::{MockTime, TimeSource};

/// Increments a counter, then sleeps on a periodic timer - the classic
/// shape of a sensor or control loop.
struct PeriodicCounter<'a> {
    period_us: u64,
    timer: Option<TimerHandle>,
    count: &'a Cell<u32>,
}

impl<'a> PeriodicCounter<'a> {
    fn new(period_us: u64, count: &'a Cell<u32>) -> Self {
        Self {
            period_us,
            timer: None,
            count,
        }
    }
}

impl ProtoTask for PeriodicCounter<'_> {
    fn poll(&mut self, ctx: &mut TaskCtx<'_>) -> Directive {
        self.count.set(self.count.get() + 1);
        let handle = match self.timer {
            Some(h) => h,
            None => {
                let h = ctx.create_timer(self.period_us).unwrap();
                self.timer = Some(h);
                h
            }
        };
        Directive::WaitTimer(handle)
    }
}

/// Runs every eligible tick and never suspends on anything.
#[derive(Default)]
struct YieldForever {
    runs: u32,
}

impl ProtoTask for YieldForever {
    fn poll(&mut self, _ctx: &mut TaskCtx<'_>) -> Directive {
        self.runs += 1;
        Directive::Yield
    }
}

/// Records every poll and the wake reason, then re-enters a semaphore wait.
struct SemWaiter<'a> {
    sem: &'static SchedSemaphore,
    timeout_us: u64,
    polls: &'a Cell<u32>,
    last_reason: &'a Cell<WakeReason>,
}

impl ProtoTask for SemWaiter<'_> {
    fn poll(&mut self, ctx: &mut TaskCtx<'_>) -> Directive {
        self.polls.set(self.polls.get() + 1);
        self.last_reason.set(ctx.wake_reason());
        Directive::WaitSemaphore {
            sem: self.sem,
            timeout_us: self.timeout_us,
        }
    }
}

#[test]
fn two_periodic_tasks_track_their_rates() {
    let time = MockTime::new();
    let a_count = Cell::new(0);
    let b_count = Cell::new(0);
    let mut a = PeriodicCounter::new(10_000, &a_count);
    let mut b = PeriodicCounter::new(1_000, &b_count);

    {
        let mut sched = Scheduler::new(&time);
        sched.create_task(&mut a, "a", 0).unwrap();
        sched.create_task(&mut b, "b", 5).unwrap();

        for _ in 0..100 {
            time.advance(1_000);
            sched.tick();
        }
    }

    // a (priority 0): first run on tick 1 arms the 10ms timer at t=1ms,
    // which then fires at 11ms, 21ms, ... 91ms: 1 + 9 runs.
    assert_eq!(a_count.get(), 10);

    // b (priority 5): the aging counter delays the first run to tick 6
    // (t=6ms), where the 1ms timer is armed; from then on the timer fires
    // every tick and a satisfied wait runs in the same tick, so b runs on
    // every one of ticks 6..=100.
    assert_eq!(b_count.get(), 95);
}

#[test]
fn priority_n_runs_once_every_n_plus_one_ticks() {
    let time = MockTime::new();
    let mut task = YieldForever::default();

    {
        let mut sched = Scheduler::new(&time);
        sched.create_task(&mut task, "aged", 3).unwrap();
        for _ in 0..40 {
            sched.tick();
        }
    }

    // base priority 3: runs on ticks 4, 8, ..., 40
    assert_eq!(task.runs, 10);
}

#[test]
fn full_table_rejects_creation_without_mutation() {
    let time = MockTime::new();
    // slot 0 is the accounting task, so MAX_TASKS - 1 user tasks fill it
    let mut fillers: Vec<YieldForever> = (0..MAX_TASKS - 1).map(|_| YieldForever::default()).collect();
    let mut extra = YieldForever::default();

    let mut sched = Scheduler::new(&time);
    for filler in fillers.iter_mut() {
        sched.create_task(filler, "filler", 1).unwrap();
    }
    assert_eq!(sched.task_count(), MAX_TASKS);

    let before = sched.task_snapshot();
    assert_eq!(
        sched.create_task(&mut extra, "extra", 1),
        Err(SchedError::TaskTableFull)
    );
    assert_eq!(sched.task_snapshot(), before);
    assert_eq!(sched.task_count(), MAX_TASKS);
}

#[test]
fn signaled_wait_resumes_in_the_same_tick() {
    static SEM: SchedSemaphore = SchedSemaphore::new();

    let time = MockTime::new();
    let polls = Cell::new(0);
    let reason = Cell::new(WakeReason::Unknown);
    let mut waiter = SemWaiter {
        sem: &SEM,
        timeout_us: u64::MAX,
        polls: &polls,
        last_reason: &reason,
    };

    let mut sched = Scheduler::new(&time);
    sched.create_task(&mut waiter, "waiter", 0).unwrap();

    time.advance(1_000);
    sched.tick(); // first poll enters the wait
    assert_eq!(polls.get(), 1);
    assert_eq!(reason.get(), WakeReason::Unknown);

    time.advance(1_000);
    sched.tick(); // nothing pending
    assert_eq!(polls.get(), 1);

    SEM.signal();
    time.advance(1_000);
    sched.tick(); // wakes and runs within this tick, not the next
    assert_eq!(polls.get(), 2);
    assert_eq!(reason.get(), WakeReason::Event);
}

#[test]
fn double_signal_wakes_exactly_once() {
    static SEM: SchedSemaphore = SchedSemaphore::new();

    let time = MockTime::new();
    let polls = Cell::new(0);
    let reason = Cell::new(WakeReason::Unknown);
    let mut waiter = SemWaiter {
        sem: &SEM,
        timeout_us: u64::MAX,
        polls: &polls,
        last_reason: &reason,
    };

    let mut sched = Scheduler::new(&time);
    sched.create_task(&mut waiter, "waiter", 0).unwrap();

    time.advance(1_000);
    sched.tick();
    assert_eq!(polls.get(), 1);

    SEM.signal();
    SEM.signal(); // collapses into the first
    time.advance(1_000);
    sched.tick();
    assert_eq!(polls.get(), 2);

    time.advance(1_000);
    sched.tick(); // no second wake
    assert_eq!(polls.get(), 2);
}

#[test]
fn timeout_expiry_wakes_the_waiter() {
    static SEM: SchedSemaphore = SchedSemaphore::new();

    let time = MockTime::new();
    let polls = Cell::new(0);
    let reason = Cell::new(WakeReason::Unknown);
    let mut waiter = SemWaiter {
        sem: &SEM,
        timeout_us: 5_000,
        polls: &polls,
        last_reason: &reason,
    };

    let mut sched = Scheduler::new(&time);
    sched.create_task(&mut waiter, "waiter", 0).unwrap();

    time.advance(1_000);
    sched.tick(); // wait starts at t=1ms
    for _ in 0..4 {
        time.advance(1_000);
        sched.tick();
    }
    assert_eq!(polls.get(), 1); // t=5ms: 4ms elapsed, not yet

    time.advance(1_000);
    sched.tick(); // t=6ms: timeout elapsed
    assert_eq!(polls.get(), 2);
    assert_eq!(reason.get(), WakeReason::Timeout);
}

#[test]
fn timeout_takes_precedence_over_pending_signal() {
    static SEM: SchedSemaphore = SchedSemaphore::new();

    let time = MockTime::new();
    let polls = Cell::new(0);
    let reason = Cell::new(WakeReason::Unknown);
    let mut waiter = SemWaiter {
        sem: &SEM,
        timeout_us: 5_000,
        polls: &polls,
        last_reason: &reason,
    };

    let mut sched = Scheduler::new(&time);
    sched.create_task(&mut waiter, "waiter", 0).unwrap();

    time.advance(1_000);
    sched.tick(); // wait starts at t=1ms

    // both conditions satisfied in the same tick: timeout wins and the
    // signal is left unconsumed
    SEM.signal();
    time.advance(6_000);
    sched.tick();
    assert_eq!(polls.get(), 2);
    assert_eq!(reason.get(), WakeReason::Timeout);
    assert!(SEM.is_signaled());

    // the re-entered wait then consumes the still-pending signal
    time.advance(1_000);
    sched.tick();
    assert_eq!(polls.get(), 3);
    assert_eq!(reason.get(), WakeReason::Event);
    assert!(!SEM.is_signaled());
}

#[test]
fn load_metric_reflects_only_the_latest_window() {
    /// Burns 900us of simulated CPU per run by advancing the mock clock
    /// from inside its own body, then terminates after a fixed number of
    /// runs so the later accounting windows are completely idle.
    struct BusyFor<'a> {
        time: &'a MockTime,
        remaining: u32,
    }
    impl ProtoTask for BusyFor<'_> {
        fn poll(&mut self, _ctx: &mut TaskCtx<'_>) -> Directive {
            if self.remaining == 0 {
                return Directive::Stop;
            }
            self.remaining -= 1;
            self.time.advance(900);
            Directive::Yield
        }
    }

    let time = MockTime::new();
    let mut busy = BusyFor {
        time: &time,
        remaining: 100,
    };

    let mut sched = Scheduler::new(&time);
    sched.create_task(&mut busy, "busy", 0).unwrap();
    assert_eq!(sched.average_load_percent(), 0);

    // phase 1: the busy task saturates every tick until it stops at
    // t ~ 191ms, before the first 200ms report lands
    while time.now_us() < 220_000 {
        time.advance(1_000);
        sched.tick();
    }
    assert_eq!(sched.average_load_percent(), 100);

    // phase 2: the next report covers an entirely idle window and must
    // track it alone, not a blend with the saturated past
    while time.now_us() < 440_000 {
        time.advance(1_000);
        sched.tick();
    }
    assert_eq!(sched.average_load_percent(), 0);
}

#[test]
fn introspection_exposes_wait_state_and_name() {
    static SEM: SchedSemaphore = SchedSemaphore::new();

    let time = MockTime::new();
    let polls = Cell::new(0);
    let reason = Cell::new(WakeReason::Unknown);
    let mut waiter = SemWaiter {
        sem: &SEM,
        timeout_us: u64::MAX,
        polls: &polls,
        last_reason: &reason,
    };

    let mut sched = Scheduler::new(&time);
    let id = sched.create_task(&mut waiter, "baro_reader", 2).unwrap();

    let info = sched.task_info(id).unwrap();
    assert_eq!(info.name, "baro_reader");
    assert_eq!(info.state, TaskState::Running);
    assert_eq!(info.base_priority, 2);

    // three ticks: two aging ticks, then the first poll enters the wait
    for _ in 0..3 {
        time.advance(1_000);
        sched.tick();
    }
    let info = sched.task_info(id).unwrap();
    assert_eq!(info.state, TaskState::WaitingSemaphore);
}
