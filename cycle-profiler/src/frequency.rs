use std::time::Duration;

use timer::TickSource;
use timer::WallClock;
use tracing::debug;
use tracing::warn;

/// Estimate how many ticks per second the `counter` produces, by busy-waiting
/// on the `wall_clock` for the given `window`.
///
/// The result is rounded down. If the wall clock does not advance at all during
/// the window, no estimate is possible and 0 is returned. If the wall clock
/// never advances although the window is non-empty, this function does not
/// return.
pub fn estimate_counter_frequency<C, W>(counter: &C, wall_clock: &W, window: Duration) -> u64
where
    C: TickSource + ?Sized,
    W: WallClock + ?Sized,
{
    let wall_frequency = u128::from(wall_clock.frequency());
    let wait = wall_frequency * window.as_micros() / 1_000_000;

    let cycles_start = counter.read_ticks();
    let wall_start = wall_clock.read_ticks();

    let mut wall_elapsed = 0;
    while u128::from(wall_elapsed) < wait {
        wall_elapsed = wall_clock.read_ticks().saturating_sub(wall_start);
    }

    let cycles_elapsed = counter.read_ticks().saturating_sub(cycles_start);
    if wall_elapsed == 0 {
        warn!(?window, "wall clock did not advance, cannot estimate counter frequency");
        return 0;
    }

    let frequency = wall_frequency * u128::from(cycles_elapsed) / u128::from(wall_elapsed);
    let frequency = u64::try_from(frequency).unwrap_or(u64::MAX);
    debug!(cycles_elapsed, wall_elapsed, frequency, "calibrated cycle counter");

    frequency
}

/// Convert a number of cycles into nanoseconds, given the counter's frequency.
/// A frequency of 0 means that the frequency is unknown, in which case 0 is
/// returned.
pub fn cycles_to_nanoseconds(cycles: u64, frequency: u64) -> f64 {
    if frequency == 0 {
        return 0.0;
    }
    let cycles_per_nanosecond = frequency as f64 / 1e9;
    cycles as f64 / cycles_per_nanosecond
}
