use crate::TickSource;

/// The CPU's cycle counter.
///
/// | architecture | counter                                                    |
/// |:-------------|:-----------------------------------------------------------|
/// | `x86_64`     | time stamp counter, read with `rdtsc`                      |
/// | `aarch64`    | virtual counter register `cntvct_el0`                      |
/// | other        | falls back to the [OS wall clock](crate::OsWallClock) (µs) |
///
/// Neither hardware counter has a frequency that can be queried reliably from
/// user space. The profiler estimates it by comparing against a
/// [`WallClock`](crate::WallClock).
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CycleCounter;

impl CycleCounter {
    /// Whether this build reads an actual hardware counter, as opposed to the
    /// operating system's timer.
    pub const IS_HARDWARE_COUNTER: bool =
        cfg!(any(target_arch = "x86_64", target_arch = "aarch64"));
}

impl TickSource for CycleCounter {
    #[inline]
    fn read_ticks(&self) -> u64 {
        read_cycle_counter()
    }
}

/// Read the CPU's time stamp counter.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read_cycle_counter() -> u64 {
    // SAFETY: `rdtsc` is part of the x86_64 baseline and has no preconditions.
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
}

/// Read the virtual counter register `cntvct_el0`, which is accessible from
/// user space.
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn read_cycle_counter() -> u64 {
    let ticks: u64;

    // SAFETY: reading `cntvct_el0` has no side effects and is permitted at EL0.
    unsafe {
        core::arch::asm!(
            "mrs {ticks}, cntvct_el0",
            ticks = out(reg) ticks,
            options(nomem, nostack, preserves_flags),
        );
    }

    ticks
}

/// No supported hardware counter: use the operating system's timer instead.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
pub fn read_cycle_counter() -> u64 {
    crate::OsWallClock.read_ticks()
}
