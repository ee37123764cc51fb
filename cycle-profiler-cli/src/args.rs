use std::time::Duration;

use clap::Parser;
use clap::value_parser;

pub(crate) const DEFAULT_NUM_PAIRS: u64 = 100_000;
pub(crate) const LOG_ENV: &str = "CYCLE_PROFILER_LOGLEVEL";

#[derive(Debug, Clone, Eq, PartialEq, Parser)]
#[command(author, version, about)]
pub(crate) struct Args {
    /// Number of random coordinate pairs to compute the distance of
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_NUM_PAIRS,
        value_parser = value_parser!(u64).range(1..)
    )]
    pub pairs: u64,

    /// Seed of the random number generator
    #[arg(long, value_name = "u64", default_value_t = 0)]
    pub seed: u64,

    /// How long to calibrate the cycle counter's frequency, in milliseconds
    #[arg(long, value_name = "MS", value_parser = value_parser!(u64).range(1..))]
    pub calibration_ms: Option<u64>,

    /// Print the report without colors
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    pub fn calibration_window(&self) -> Option<Duration> {
        self.calibration_ms.map(Duration::from_millis)
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            pairs: DEFAULT_NUM_PAIRS,
            seed: 0,
            calibration_ms: None,
            no_color: false,
        }
    }
}
