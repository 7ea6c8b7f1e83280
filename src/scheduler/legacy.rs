//! Adapter for old-style fixed-interval callback tasks
//!
//! Earlier firmware expressed periodic work as a bare `fn(now_us)` invoked at
//! a fixed interval. [`LegacyTask`] wraps such a callback as a [`ProtoTask`]
//! so it runs unmodified under the cooperative model: the first poll sets up
//! the interval timer, every fire after that invokes the callback once.

use super::task::{Directive, ProtoTask, TaskCtx};
use super::timer::TimerHandle;

/// Signature of a legacy fixed-interval callback.
pub type LegacyTaskFn = fn(now_us: u64);

/// Protothread wrapper around a [`LegacyTaskFn`].
pub struct LegacyTask {
    callback: LegacyTaskFn,
    interval_us: u64,
    timer: Option<TimerHandle>,
}

impl LegacyTask {
    /// Wraps `callback` to be invoked once every `interval_us`.
    pub fn new(callback: LegacyTaskFn, interval_us: u64) -> Self {
        Self {
            callback,
            interval_us,
            timer: None,
        }
    }
}

impl ProtoTask for LegacyTask {
    fn poll(&mut self, ctx: &mut TaskCtx<'_>) -> Directive {
        match self.timer {
            None => match ctx.create_timer(self.interval_us) {
                Ok(handle) => {
                    self.timer = Some(handle);
                    Directive::WaitTimer(handle)
                }
                Err(_) => {
                    // without a timer the callback can never fire again
                    crate::log_warn!("legacy task: timer table full, stopping");
                    Directive::Stop
                }
            },
            Some(handle) => {
                (self.callback)(ctx.now_us());
                Directive::WaitTimer(handle)
            }
        }
    }
}
