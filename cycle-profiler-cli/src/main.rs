//! Profiles a haversine-distance workload with the cycle profiler: generates
//! random coordinate pairs, averages their great-circle distances, and prints
//! the resulting profile.

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use profiler::Session;
use profiler::config::overwrite_calibration_window_to;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::args::LOG_ENV;

pub(crate) mod args;
pub(crate) mod haversine;

const DEFAULT_LOG_DIRECTIVES: &str = "cycle_profiler=info,cycle_profiler_cli=info";

fn main() -> Result<()> {
    initialize_logging();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }
    if let Some(window) = args.calibration_window() {
        overwrite_calibration_window_to(window)?;
    }
    let num_pairs = usize::try_from(args.pairs).context("too many pairs for this platform")?;
    info!(num_pairs, seed = args.seed, "profiling haversine workload");

    let mut session = Session::new();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let pairs = haversine::generate_pairs(&mut session, &mut rng, num_pairs);
    let average = haversine::average_distance(&mut session, &pairs);
    let report = session.finish();

    println!("{} {average:.6}", "Average distance:".bold());
    println!(
        "{} {:.3?} at {:.3} MHz\n",
        "Total time:".bold(),
        report.total_time(),
        report.frequency() as f64 / 1e6,
    );
    print!("{}", report.colored());

    Ok(())
}

/// Log to standard error. The filter is read from `RUST_LOG`, falling back to
/// `CYCLE_PROFILER_LOGLEVEL`.
fn initialize_logging() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV)
        .or_else(|_| std::env::var(LOG_ENV))
        .unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVES.to_string());
    let filter = EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
