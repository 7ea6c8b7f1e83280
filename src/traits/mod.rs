//! Platform abstraction traits
//!
//! The scheduler is decoupled from any particular clock hardware through
//! the [`time::TimeSource`] trait. Embedded targets inject an Embassy-backed
//! implementation; host tests drive the engine with a controllable mock.

pub mod time;

pub use time::TimeSource;

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;
pub use time::MockTime;
