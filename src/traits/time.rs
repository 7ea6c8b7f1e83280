//! Time abstraction for platform-agnostic scheduling.
//!
//! All scheduler timing is expressed in microseconds on a monotonic clock.
//! The [`TimeSource`] trait abstracts over the clock provider:
//! - `EmbassyTime` for embedded targets using the Embassy time driver
//! - `MockTime` for host testing with controllable time

/// Monotonic microsecond clock for the scheduler.
///
/// # Example
///
/// ```ignore
/// fn poll_due<T: TimeSource>(time: &T, deadline_us: u64) -> bool {
///     time.now_us() >= deadline_us
/// }
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Returns current time in microseconds since system start.
    fn now_us(&self) -> u64;

    /// Returns current time in milliseconds since system start.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction to handle a reference in the future.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// A shared clock handle is itself a clock.
///
/// This lets a test own a `MockTime` and hand the scheduler a borrow of it,
/// keeping the ability to advance time from outside.
impl<T: TimeSource + Sync> TimeSource for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

// ============================================================================
// Embassy Implementation
// ============================================================================

/// Embassy-based time source using the Embassy time driver.
#[cfg(feature = "embassy")]
#[derive(Clone, Copy, Default)]
pub struct EmbassyTime;

#[cfg(feature = "embassy")]
impl TimeSource for EmbassyTime {
    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock time source with controllable time advancement.
///
/// Enables deterministic testing of timing-dependent scheduler behavior:
/// the clock only moves when the test (or a simulated task body) advances it.
///
/// # Example
///
/// ```
/// use protosched::traits::time::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// assert_eq!(time.now_us(), 0);
///
/// time.advance(1500);
/// assert_eq!(time.now_us(), 1500);
/// assert_eq!(time.now_ms(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: core::cell::Cell<u64>,
}

// Safety: MockTime is only used in single-threaded test contexts where Cell
// is safe. The Send+Sync bounds on TimeSource are required for embedded
// contexts, but MockTime is not used there.
unsafe impl Send for MockTime {}
unsafe impl Sync for MockTime {}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self {
            current_us: core::cell::Cell::new(0),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
