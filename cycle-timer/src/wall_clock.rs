use std::time::Instant;

use lazy_static::lazy_static;

use crate::TickSource;
use crate::WallClock;

/// The [frequency](WallClock::frequency) of the [`OsWallClock`]: one tick per
/// microsecond.
pub const OS_WALL_CLOCK_FREQUENCY: u64 = 1_000_000;

lazy_static! {
    /// All [`OsWallClock`] readings are relative to this point in time, which
    /// is fixed the first time any wall clock is read.
    static ref ANCHOR: Instant = Instant::now();
}

/// The operating system's monotonic clock, in microseconds.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OsWallClock;

impl TickSource for OsWallClock {
    fn read_ticks(&self) -> u64 {
        let micros = ANCHOR.elapsed().as_micros();
        u64::try_from(micros).unwrap_or(u64::MAX)
    }
}

impl WallClock for OsWallClock {
    fn frequency(&self) -> u64 {
        OS_WALL_CLOCK_FREQUENCY
    }
}
