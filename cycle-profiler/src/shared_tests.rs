//! Deterministic clocks for testing sessions without depending on the speed of
//! the machine running the tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use timer::OS_WALL_CLOCK_FREQUENCY;
use timer::TickSource;
use timer::WallClock;

use crate::config::Config;
use crate::session::Session;

/// Cycles that only pass when the test says so. Shared between the simulated
/// clocks of one session and the test driving it.
#[derive(Debug, Default, Clone)]
pub(crate) struct SimulatedTime(Rc<Cell<u64>>);

impl SimulatedTime {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, cycles: u64) {
        self.0.set(self.now() + cycles);
    }
}

/// Reads the simulated time without affecting it.
#[derive(Debug, Clone)]
pub(crate) struct SimulatedCycleCounter(pub SimulatedTime);

impl TickSource for SimulatedCycleCounter {
    fn read_ticks(&self) -> u64 {
        self.0.now()
    }
}

/// Reading this clock lets [`Self::cycles_per_tick`] cycles pass, which makes
/// busy-waiting on it terminate. Ticks at the same rate as the
/// [OS wall clock](timer::OsWallClock).
#[derive(Debug, Clone)]
pub(crate) struct SimulatedWallClock {
    pub time: SimulatedTime,
    pub cycles_per_tick: u64,
}

impl TickSource for SimulatedWallClock {
    fn read_ticks(&self) -> u64 {
        self.time.advance(self.cycles_per_tick);
        self.time.now() / self.cycles_per_tick
    }
}

impl WallClock for SimulatedWallClock {
    fn frequency(&self) -> u64 {
        OS_WALL_CLOCK_FREQUENCY
    }
}

/// With this many cycles per wall-clock microsecond, the simulated cycle
/// counter runs at roughly 1 GHz.
pub(crate) const SIMULATED_CYCLES_PER_MICROSECOND: u64 = 1_000;

pub(crate) type SimulatedSession = Session<SimulatedCycleCounter, SimulatedWallClock>;

/// A session on simulated clocks that begins at time 0, together with the
/// handle to advance its time.
pub(crate) fn simulated_session() -> (SimulatedSession, SimulatedTime) {
    let time = SimulatedTime::default();
    let counter = SimulatedCycleCounter(time.clone());
    let wall_clock = SimulatedWallClock {
        time: time.clone(),
        cycles_per_tick: SIMULATED_CYCLES_PER_MICROSECOND,
    };
    let Ok(config) = Config::default().with_calibration_window(Duration::from_millis(1)) else {
        unreachable!("calibration window is non-zero");
    };

    (Session::with_config(counter, wall_clock, config), time)
}
