//! Tick sources consumed by the [cycle profiler][profiler].
//!
//! A profiler needs two kinds of clocks:
//! - a [`TickSource`] that is as cheap and as fine-grained as possible, used
//!   to time every profiled scope. On supported architectures, this is the
//!   [`CycleCounter`].
//! - a [`WallClock`] with a known, fixed [frequency](WallClock::frequency).
//!   It is only used to calibrate the frequency of the cycle counter at the
//!   end of a profiling session. See [`OsWallClock`].
//!
//! Which cycle counter is used is decided at build time, based on the target
//! architecture. Use [`CycleCounter::IS_HARDWARE_COUNTER`] to find out whether
//! the current build reads a hardware counter or falls back to the OS timer.
//!
//! [profiler]: https://docs.rs/cycle-profiler

// See the corresponding attribute in cycle_profiler/lib.rs
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub use crate::cycle_counter::CycleCounter;
pub use crate::wall_clock::OS_WALL_CLOCK_FREQUENCY;
pub use crate::wall_clock::OsWallClock;

pub mod cycle_counter;
pub mod wall_clock;

/// Anything that produces monotonically increasing ticks.
///
/// The absolute value of a tick is meaningless; only differences between two
/// readings of the same source are. There is no guarantee about the duration
/// of a single tick.
pub trait TickSource {
    fn read_ticks(&self) -> u64;
}

/// A [`TickSource`] that ticks at a fixed, known rate.
pub trait WallClock: TickSource {
    /// The number of ticks per second.
    fn frequency(&self) -> u64;
}
