//! Cooperative protothread task scheduler
//!
//! Tasks are stackless state machines implementing [`task::ProtoTask`]. The
//! dispatcher ([`exec::Scheduler::tick`]) walks a fixed table of task slots
//! once per invocation, ages each task's priority counter, re-evaluates wait
//! conditions, and resumes whatever became runnable - all on the caller's
//! stack, one task at a time.
//!
//! # Components
//!
//! - [`types`]: task states, wake reasons, introspection snapshots
//! - [`error`]: synchronous failure types
//! - [`timer`]: periodic timers with drift-free catch-up
//! - [`semaphore`]: binary edge-triggered event flags
//! - [`task`]: the task trait, suspension directives, and the poll context
//! - [`exec`]: the scheduler core and its built-in accounting task
//! - [`legacy`]: adapter for old-style fixed-interval callbacks
//!
//! # Example
//!
//! ```
//! use protosched::scheduler::{Directive, ProtoTask, Scheduler, TaskCtx, TimerHandle};
//! use protosched::traits::time::{MockTime, TimeSource};
//!
//! struct Blink {
//!     timer: Option<TimerHandle>,
//! }
//!
//! impl ProtoTask for Blink {
//!     fn poll(&mut self, ctx: &mut TaskCtx<'_>) -> Directive {
//!         match self.timer {
//!             None => match ctx.create_timer(500_000) {
//!                 Ok(h) => {
//!                     self.timer = Some(h);
//!                     Directive::WaitTimer(h)
//!                 }
//!                 Err(_) => Directive::Stop,
//!             },
//!             Some(h) => {
//!                 // toggle the LED here
//!                 Directive::WaitTimer(h)
//!             }
//!         }
//!     }
//! }
//!
//! let time = MockTime::new();
//! let mut blink = Blink { timer: None };
//! let mut sched = Scheduler::new(&time);
//! sched.create_task(&mut blink, "blink", 0).unwrap();
//! loop {
//!     time.advance(1_000);
//!     sched.tick();
//!     if time.now_us() > 2_000_000 {
//!         break;
//!     }
//! }
//! ```

pub mod error;
pub mod exec;
pub mod legacy;
pub mod semaphore;
pub mod task;
pub mod timer;
pub mod types;

pub use error::SchedError;
pub use exec::Scheduler;
pub use legacy::{LegacyTask, LegacyTaskFn};
pub use semaphore::SchedSemaphore;
pub use task::{Directive, ProtoTask, TaskCtx};
pub use timer::{SchedTimer, TimerHandle};
pub use types::{TaskId, TaskInfo, TaskState, WakeReason, MAX_TASKS, MAX_TIMERS};
