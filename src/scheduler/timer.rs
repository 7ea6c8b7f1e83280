//! Periodic timers with drift-free catch-up
//!
//! Timers live in a fixed arena owned by the scheduler and are referenced by
//! [`TimerHandle`]. A task allocates its timers through
//! [`crate::scheduler::TaskCtx::create_timer`]; the arena never reclaims a
//! slot, matching the task table's allocate-once lifetime.
//!
//! A timer keeps two notions of its last fire: the *scheduled* time, which
//! advances only in whole periods so the long-run rate never drifts, and the
//! *actual* time, from which the jitter-inclusive measured interval is
//! derived. When ticks are delayed past several periods, the catch-up loop
//! batches the missed deadlines into a single fire rather than firing
//! repeatedly.

use super::error::SchedError;
use super::types::MAX_TIMERS;

/// Handle to a timer slot in the scheduler's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerHandle(pub(crate) usize);

/// Periodic deadline generator
#[derive(Debug, Clone, Copy)]
pub struct SchedTimer {
    period_us: u64,
    scheduled_fire_us: u64,
    last_fire_us: u64,
    last_interval_us: u64,
}

impl SchedTimer {
    /// Creates a timer whose first deadline is one period after `now_us`.
    pub(crate) fn new(period_us: u64, now_us: u64) -> Self {
        Self {
            // a zero period would stall the catch-up loop
            period_us: period_us.max(1),
            scheduled_fire_us: now_us,
            last_fire_us: now_us,
            last_interval_us: 0,
        }
    }

    /// Nominal period in microseconds.
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Measured interval between the last two actual fires, jitter included.
    /// Zero until the timer has fired once.
    pub fn last_interval_us(&self) -> u64 {
        self.last_interval_us
    }

    /// Scheduled time of the most recent fire (whole-period aligned).
    pub fn scheduled_fire_us(&self) -> u64 {
        self.scheduled_fire_us
    }

    /// Polls the timer against the current time.
    ///
    /// Fires when at least one full period has elapsed since the scheduled
    /// last fire. On fire, the scheduled timestamp catches up in whole
    /// periods to within one period of `now_us` (never past it), so a batch
    /// of missed deadlines produces one fire and no accumulated drift.
    pub(crate) fn check(&mut self, now_us: u64) -> bool {
        if now_us.saturating_sub(self.scheduled_fire_us) < self.period_us {
            return false;
        }
        while now_us.saturating_sub(self.scheduled_fire_us) >= self.period_us {
            self.scheduled_fire_us += self.period_us;
        }
        self.trigger(now_us);
        true
    }

    /// Records an actual fire and the measured inter-fire interval.
    fn trigger(&mut self, now_us: u64) {
        self.last_interval_us = now_us.saturating_sub(self.last_fire_us);
        self.last_fire_us = now_us;
    }
}

/// Fixed arena of timer slots
pub(crate) struct TimerArena {
    slots: [Option<SchedTimer>; MAX_TIMERS],
}

impl TimerArena {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [None; MAX_TIMERS],
        }
    }

    /// First-fit allocation of a timer starting at `now_us`.
    pub(crate) fn create(&mut self, period_us: u64, now_us: u64) -> Result<TimerHandle, SchedError> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(SchedError::TimerTableFull)?;
        self.slots[slot] = Some(SchedTimer::new(period_us, now_us));
        Ok(TimerHandle(slot))
    }

    pub(crate) fn get(&self, handle: TimerHandle) -> Option<&SchedTimer> {
        self.slots.get(handle.0).and_then(|s| s.as_ref())
    }

    /// Polls the referenced timer; a stale handle never fires.
    pub(crate) fn check(&mut self, handle: TimerHandle, now_us: u64) -> bool {
        match self.slots.get_mut(handle.0).and_then(|s| s.as_mut()) {
            Some(timer) => timer.check(now_us),
            None => false,
        }
    }
}
